mod acyclic;
mod position;
mod ranking;
mod routing;
pub(crate) mod types;
pub use types::*;

use acyclic::break_cycles;
use position::{PlacementInput, assign_coordinates};
use ranking::{assign_layers, build_layer_buckets, count_crossings, order_layers};
use routing::{RouteInput, route_edges, self_loop_reserve};

use crate::config::LayoutConfig;
use crate::ir::{Graph, Node, NodeId};
use crate::text_metrics::{NodeSize, measure_node};
use std::collections::HashMap;
use tracing::{debug, debug_span, trace};

/// One successor reference resolved to dense node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LogicalEdge {
    pub(crate) source: usize,
    pub(crate) target: usize,
    pub(crate) class: EdgeClass,
}

/// Branch classification for `source -> target`: only a source whose last
/// instruction carries both a jump and a fail target produces branch edges.
pub fn classify_edge(source: &Node, target: &Node) -> EdgeClass {
    let Some(last) = source.last_instruction() else {
        return EdgeClass::Plain;
    };
    match (last.jump, last.fail) {
        (Some(jump), _) if jump == target.address && last.is_two_way_branch() => {
            EdgeClass::TrueBranch
        }
        (_, Some(fail)) if fail == target.address && last.is_two_way_branch() => {
            EdgeClass::FalseBranch
        }
        _ => EdgeClass::Plain,
    }
}

pub fn compute_layout(graph: &Graph, config: &LayoutConfig) -> LayoutResult {
    let span = debug_span!(
        "compute_layout",
        kind = ?graph.kind,
        nodes = graph.nodes.len(),
        edges = graph.edge_count()
    );
    let _enter = span.enter();

    // ── Dense index ─────────────────────────────────────────────────
    let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(graph.nodes.len());
    let mut members: Vec<&Node> = Vec::with_capacity(graph.nodes.len());
    let mut duplicate_nodes = 0usize;
    for node in &graph.nodes {
        if index.contains_key(&node.id) {
            duplicate_nodes += 1;
            trace!(id = %node.id, "duplicate node id ignored");
            continue;
        }
        index.insert(node.id, members.len());
        members.push(node);
    }
    if members.is_empty() {
        return LayoutResult::empty(config.metrics);
    }
    let n = members.len();

    let sizes: Vec<NodeSize> = members
        .iter()
        .map(|node| measure_node(node, &config.metrics))
        .collect();

    // ── Logical edges ───────────────────────────────────────────────
    let mut edges: Vec<LogicalEdge> = Vec::new();
    let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut dropped_edges = 0usize;
    for (source, node) in members.iter().enumerate() {
        for succ in &node.successors {
            let Some(&target) = index.get(succ) else {
                dropped_edges += 1;
                trace!(source = %node.id, target = %succ, "dangling successor dropped");
                continue;
            };
            out_edges[source].push(edges.len());
            edges.push(LogicalEdge {
                source,
                target,
                class: classify_edge(node, members[target]),
            });
        }
    }

    // ── Layering and ordering ───────────────────────────────────────
    let acyclic = break_cycles(n, &edges, &out_edges);
    let layer = assign_layers(&acyclic.succ, &acyclic.pred);
    let mut buckets = build_layer_buckets(&layer);
    order_layers(&mut buckets, &layer, &acyclic.succ, &acyclic.pred, config.order_passes);
    let crossings = count_crossings(&buckets, &layer, &acyclic.succ);
    debug!(
        layers = buckets.len(),
        back_edges = acyclic.back_edge_count(),
        crossings,
        "layers ordered"
    );

    // ── Coordinates ─────────────────────────────────────────────────
    let mut loops = vec![0usize; n];
    for edge in &edges {
        if edge.source == edge.target {
            loops[edge.source] += 1;
        }
    }
    let width: Vec<f32> = sizes.iter().map(|size| size.width).collect();
    let height: Vec<f32> = sizes.iter().map(|size| size.height).collect();
    let footprint: Vec<f32> = width
        .iter()
        .zip(&loops)
        .map(|(w, &count)| w + self_loop_reserve(count, config))
        .collect();
    let placement = assign_coordinates(
        PlacementInput {
            buckets,
            width: &width,
            height: &height,
            footprint: &footprint,
            succ: &acyclic.succ,
            pred: &acyclic.pred,
        },
        config,
    );

    let mut order = vec![0usize; n];
    for bucket in &placement.buckets {
        for (pos, &v) in bucket.iter().enumerate() {
            order[v] = pos;
        }
    }
    let nodes: Vec<LayoutNode> = members
        .iter()
        .enumerate()
        .map(|(idx, node)| LayoutNode {
            id: node.id,
            address: node.address,
            x: placement.x[idx],
            y: placement.y[idx],
            width: width[idx],
            height: height[idx],
            layer: layer[idx],
            order: order[idx],
            instruction_rows: sizes[idx].instruction_rows,
        })
        .collect();

    // ── Routing ─────────────────────────────────────────────────────
    let routed = route_edges(
        &RouteInput {
            nodes: &nodes,
            edges: &edges,
            back: &acyclic.back,
            placement: &placement,
            footprint: &footprint,
        },
        config,
    );

    let stats = LayoutStats {
        layers: placement.layer_top.len(),
        back_edges: acyclic.back_edge_count(),
        self_loops: loops.iter().sum(),
        dropped_edges,
        duplicate_nodes,
        crossings,
    };
    debug!(edges = routed.len(), dropped_edges, duplicate_nodes, "layout complete");

    LayoutResult {
        nodes,
        edges: routed,
        stats,
        metrics: config.metrics,
    }
}

/// Shifts the layout so its bounding box starts at `(margin, margin)`.
pub fn normalize(result: &mut LayoutResult, margin: f32) {
    if let Some(bounds) = result.bounds() {
        result.translate(margin - bounds.x, margin - bounds.y);
    }
}
