use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::LayoutConfig;

use super::LogicalEdge;
use super::position::Placement;
use super::types::{EdgeClass, LayoutNode, Point, Rect, RoutedEdge};

// ── Channel sizing ──────────────────────────────────────────────────
/// Fraction of half a gap's height usable for channel offsets; the rest
/// keeps jogs clear of the node bands.
const CHANNEL_USABLE_RATIO: f32 = 0.8;
/// Minimum clearance between a vertical lane and the nodes bounding it.
const LANE_CLEARANCE_MIN: f32 = 1.0;

// ── Self-loops ──────────────────────────────────────────────────────
/// Upper bound on the vertical step between nested self-loops, as a
/// fraction of node height.
const SELF_LOOP_STEP_RATIO: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flank {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RouteKind {
    Forward,
    Back(Flank),
    SelfLoop,
}

pub(super) struct RouteInput<'a> {
    pub(super) nodes: &'a [LayoutNode],
    pub(super) edges: &'a [LogicalEdge],
    pub(super) back: &'a [bool],
    pub(super) placement: &'a Placement,
    pub(super) footprint: &'a [f32],
}

/// Room a node needs to its right for `loops` nested self-loop detours.
pub(super) fn self_loop_reserve(loops: usize, config: &LayoutConfig) -> f32 {
    if loops == 0 {
        return 0.0;
    }
    config.self_loop_pad() + (loops - 1) as f32 * config.channel_spacing()
}

/// Alternating offset for the `index`-th occupant of a channel: center
/// first, then one step above, one below, two above, ...
pub(super) fn alternating_offset(index: usize, step: f32) -> f32 {
    let level = index.div_ceil(2) as f32;
    if index % 2 == 1 {
        -level * step
    } else {
        level * step
    }
}

/// Vertical extent of inter-layer gap `g`: gap 0 sits above layer 0, gap
/// `layers` below the last layer, gap `g` otherwise between `g-1` and `g`.
fn gap_span(placement: &Placement, g: usize, layer_gap: f32) -> (f32, f32) {
    let layers = placement.layer_top.len();
    if g == 0 {
        let top = placement.layer_top[0];
        (top - layer_gap, top)
    } else if g >= layers {
        let bottom = placement.layer_bottom[layers - 1];
        (bottom, bottom + layer_gap)
    } else {
        (placement.layer_bottom[g - 1], placement.layer_top[g])
    }
}

/// Free horizontal intervals of a layer, left to right, including one
/// gap-wide interval on each outer side.
fn free_intervals(
    placement: &Placement,
    footprint: &[f32],
    layer: usize,
    gap: f32,
) -> Vec<(f32, f32)> {
    let bucket = &placement.buckets[layer];
    let mut intervals = Vec::with_capacity(bucket.len() + 1);
    let Some(&first) = bucket.first() else {
        return intervals;
    };
    intervals.push((placement.x[first] - gap, placement.x[first]));
    for pair in bucket.windows(2) {
        let lo = placement.x[pair[0]] + footprint[pair[0]];
        let hi = placement.x[pair[1]];
        if hi > lo {
            intervals.push((lo, hi));
        }
    }
    if let Some(&last) = bucket.last() {
        let lo = placement.x[last] + footprint[last];
        intervals.push((lo, lo + gap));
    }
    intervals
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Evenly spaced port positions along `[start, start + length]`.
fn distribute(start: f32, length: f32, count: usize, slot: usize) -> f32 {
    start + length * (slot + 1) as f32 / (count + 1) as f32
}

/// Free interval chosen for one edge in one crossed layer.
#[derive(Debug, Clone)]
struct LanePick {
    layer: usize,
    slot: Option<usize>,
    /// Arrival order among the edges sharing the interval.
    rank: usize,
    desired: f32,
}

/// Lane x for occupant `rank` of `occupants` edges sharing the free interval
/// `[lo, hi]`. The step shrinks so every occupant keeps its own x.
pub(super) fn lane_x(lo: f32, hi: f32, rank: usize, occupants: usize, spacing: f32) -> f32 {
    let half = (hi - lo) / 2.0;
    let clearance = (spacing / 2.0).max(LANE_CLEARANCE_MIN).min(half / 2.0);
    let max_offset = (half - clearance).max(0.0);
    let levels = occupants.saturating_sub(1).div_ceil(2);
    let step = if levels == 0 {
        spacing
    } else {
        spacing.min(max_offset / levels as f32)
    };
    lo + half + alternating_offset(rank, step).clamp(-max_offset, max_offset)
}

struct ChannelRequest {
    edge: usize,
    jog: usize,
}

pub(super) fn route_edges(input: &RouteInput<'_>, config: &LayoutConfig) -> Vec<RoutedEdge> {
    let RouteInput {
        nodes,
        edges,
        back,
        placement,
        footprint,
    } = *input;
    if edges.is_empty() || nodes.is_empty() {
        return Vec::new();
    }
    let gap = config.node_gap();
    let layer_gap = config.layer_gap();
    let spacing = config.channel_spacing();

    let min_x = nodes
        .iter()
        .map(|node| node.x)
        .fold(f32::INFINITY, f32::min);
    let max_x = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| node.x + footprint[idx])
        .fold(f32::NEG_INFINITY, f32::max);

    // ── Classification ──────────────────────────────────────────────
    let kinds: Vec<RouteKind> = edges
        .iter()
        .zip(back)
        .map(|(edge, &is_back)| {
            if edge.source == edge.target {
                RouteKind::SelfLoop
            } else if is_back {
                let mid = (nodes[edge.source].center_x() + nodes[edge.target].center_x()) / 2.0;
                if mid - min_x <= max_x - mid {
                    RouteKind::Back(Flank::Left)
                } else {
                    RouteKind::Back(Flank::Right)
                }
            } else {
                RouteKind::Forward
            }
        })
        .collect();

    // ── Ports ───────────────────────────────────────────────────────
    let mut exits: HashMap<usize, Vec<(usize, f32)>> = HashMap::new();
    let mut entries: HashMap<usize, Vec<(usize, f32)>> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
        let (exit_key, entry_key) = match kinds[idx] {
            RouteKind::SelfLoop => continue,
            RouteKind::Forward => (
                nodes[edge.target].center_x(),
                nodes[edge.source].center_x(),
            ),
            RouteKind::Back(Flank::Left) => (f32::NEG_INFINITY, f32::NEG_INFINITY),
            RouteKind::Back(Flank::Right) => (f32::INFINITY, f32::INFINITY),
        };
        exits.entry(edge.source).or_default().push((idx, exit_key));
        entries.entry(edge.target).or_default().push((idx, entry_key));
    }

    let mut exit_port = vec![Point::new(0.0, 0.0); edges.len()];
    for (&node_idx, list) in exits.iter_mut() {
        list.sort_by(|a, b| cmp_f32(a.1, b.1).then(a.0.cmp(&b.0)));
        let mut slots: Vec<usize> = list.iter().map(|(idx, _)| *idx).collect();
        order_branch_ports(&mut slots, edges);
        let node = &nodes[node_idx];
        for (slot, &edge_idx) in slots.iter().enumerate() {
            exit_port[edge_idx] = Point::new(
                distribute(node.x, node.width, slots.len(), slot),
                node.y + node.height,
            );
        }
    }

    let mut entry_port = vec![Point::new(0.0, 0.0); edges.len()];
    for (&node_idx, list) in entries.iter_mut() {
        list.sort_by(|a, b| cmp_f32(a.1, b.1).then(a.0.cmp(&b.0)));
        let node = &nodes[node_idx];
        for (slot, &(edge_idx, _)) in list.iter().enumerate() {
            entry_port[edge_idx] =
                Point::new(distribute(node.x, node.width, list.len(), slot), node.y);
        }
    }

    // ── Vertical lanes through intermediate layers ───────────────────
    // Pick a free interval per crossed layer first; occupants of the same
    // interval are spread across it once their count is known.
    let mut interval_cache: HashMap<usize, Vec<(f32, f32)>> = HashMap::new();
    let mut lane_use: HashMap<(usize, usize), usize> = HashMap::new();
    let mut lane_picks: Vec<Vec<LanePick>> = vec![Vec::new(); edges.len()];
    for (idx, edge) in edges.iter().enumerate() {
        if kinds[idx] != RouteKind::Forward {
            continue;
        }
        let s = nodes[edge.source].layer;
        let t = nodes[edge.target].layer;
        let start = exit_port[idx].x;
        let end = entry_port[idx].x;
        for k in (s + 1)..t {
            let desired = start + (end - start) * (k - s) as f32 / (t - s) as f32;
            let intervals = interval_cache
                .entry(k)
                .or_insert_with(|| free_intervals(placement, footprint, k, gap));
            let slot = intervals
                .iter()
                .enumerate()
                .min_by(|a, b| {
                    let da = ((a.1.0 + a.1.1) / 2.0 - desired).abs();
                    let db = ((b.1.0 + b.1.1) / 2.0 - desired).abs();
                    cmp_f32(da, db)
                })
                .map(|(slot, _)| slot);
            let rank = match slot {
                Some(slot) => {
                    let used = lane_use.entry((k, slot)).or_insert(0);
                    *used += 1;
                    *used - 1
                }
                None => 0,
            };
            lane_picks[idx].push(LanePick {
                layer: k,
                slot,
                rank,
                desired,
            });
        }
    }

    // Per edge: x positions visited, one per layer from source to target.
    let mut columns: Vec<Vec<f32>> = vec![Vec::new(); edges.len()];
    for (idx, picks) in lane_picks.iter().enumerate() {
        if kinds[idx] != RouteKind::Forward {
            continue;
        }
        let mut xs = Vec::with_capacity(picks.len() + 2);
        xs.push(exit_port[idx].x);
        for pick in picks {
            let interval = pick.slot.and_then(|slot| {
                let bounds = interval_cache.get(&pick.layer)?.get(slot)?;
                Some((slot, *bounds))
            });
            let x = match interval {
                Some((slot, (lo, hi))) => {
                    let occupants = lane_use.get(&(pick.layer, slot)).copied().unwrap_or(1);
                    lane_x(lo, hi, pick.rank, occupants, spacing)
                }
                None => pick.desired,
            };
            xs.push(x);
        }
        xs.push(entry_port[idx].x);
        columns[idx] = xs;
    }

    // ── Flank lanes for back edges ──────────────────────────────────
    let flank_base = config.flank_margin().max(gap);
    let mut flank_x = vec![0.0f32; edges.len()];
    let (mut left_used, mut right_used) = (0usize, 0usize);
    for (idx, kind) in kinds.iter().enumerate() {
        match kind {
            RouteKind::Back(Flank::Left) => {
                flank_x[idx] = min_x - flank_base - left_used as f32 * spacing;
                left_used += 1;
            }
            RouteKind::Back(Flank::Right) => {
                flank_x[idx] = max_x + flank_base + right_used as f32 * spacing;
                right_used += 1;
            }
            _ => {}
        }
    }

    // ── Channel allocation inside gaps ───────────────────────────────
    // Jog `j` of a forward edge lives in gap `source_layer + 1 + j`; a back
    // edge uses jog 0 below its source and jog 1 above its target.
    let mut requests: HashMap<usize, Vec<ChannelRequest>> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
        match kinds[idx] {
            RouteKind::Forward => {
                let s = nodes[edge.source].layer;
                for (jog, pair) in columns[idx].windows(2).enumerate() {
                    if pair[0] != pair[1] {
                        requests
                            .entry(s + 1 + jog)
                            .or_default()
                            .push(ChannelRequest { edge: idx, jog });
                    }
                }
            }
            RouteKind::Back(_) => {
                requests
                    .entry(nodes[edge.source].layer + 1)
                    .or_default()
                    .push(ChannelRequest { edge: idx, jog: 0 });
                requests
                    .entry(nodes[edge.target].layer)
                    .or_default()
                    .push(ChannelRequest { edge: idx, jog: 1 });
            }
            RouteKind::SelfLoop => {}
        }
    }

    let mut channel_y: HashMap<(usize, usize), f32> = HashMap::new();
    for (&g, list) in &requests {
        let (top, bottom) = gap_span(placement, g, layer_gap);
        let mid = (top + bottom) / 2.0;
        let usable = (bottom - top) / 2.0 * CHANNEL_USABLE_RATIO;
        let levels = list.len().saturating_sub(1).div_ceil(2);
        let step = if levels == 0 {
            spacing
        } else {
            spacing.min(usable / levels as f32)
        };
        let mut ordered: Vec<&ChannelRequest> = list.iter().collect();
        ordered.sort_by_key(|req| (req.edge, req.jog));
        for (i, req) in ordered.into_iter().enumerate() {
            channel_y.insert((req.edge, req.jog), mid + alternating_offset(i, step));
        }
    }

    // ── Self-loop indices ────────────────────────────────────────────
    let mut loop_total: HashMap<usize, usize> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
        if kinds[idx] == RouteKind::SelfLoop {
            *loop_total.entry(edge.source).or_insert(0) += 1;
        }
    }
    let mut loop_seen: HashMap<usize, usize> = HashMap::new();

    // ── Polylines ────────────────────────────────────────────────────
    let mut routed = Vec::with_capacity(edges.len());
    for (idx, edge) in edges.iter().enumerate() {
        let points = match kinds[idx] {
            RouteKind::Forward => {
                let xs = &columns[idx];
                let mut points = vec![exit_port[idx]];
                for (jog, pair) in xs.windows(2).enumerate() {
                    if pair[0] != pair[1] {
                        let y = channel_y
                            .get(&(idx, jog))
                            .copied()
                            .unwrap_or(exit_port[idx].y);
                        points.push(Point::new(pair[0], y));
                        points.push(Point::new(pair[1], y));
                    }
                }
                points.push(entry_port[idx]);
                simplify_polyline(points)
            }
            RouteKind::Back(_) => {
                let exit = exit_port[idx];
                let entry = entry_port[idx];
                let below = channel_y.get(&(idx, 0)).copied().unwrap_or(exit.y);
                let above = channel_y.get(&(idx, 1)).copied().unwrap_or(entry.y);
                let fx = flank_x[idx];
                vec![
                    exit,
                    Point::new(exit.x, below),
                    Point::new(fx, below),
                    Point::new(fx, above),
                    Point::new(entry.x, above),
                    entry,
                ]
            }
            RouteKind::SelfLoop => {
                let seen = loop_seen.entry(edge.source).or_insert(0);
                let index = *seen;
                *seen += 1;
                let total = loop_total.get(&edge.source).copied().unwrap_or(1);
                route_self_loop(&nodes[edge.source], index, total, config)
            }
        };
        routed.push(RoutedEdge {
            source: nodes[edge.source].id,
            target: nodes[edge.target].id,
            points,
            class: edge.class,
            is_back_edge: kinds[idx] != RouteKind::Forward,
        });
    }
    routed
}

/// When a node has both branch edges, the true branch takes the left one
/// of the two slots they occupy.
fn order_branch_ports(slots: &mut [usize], edges: &[LogicalEdge]) {
    let true_pos = slots
        .iter()
        .position(|&idx| edges[idx].class == EdgeClass::TrueBranch);
    let false_pos = slots
        .iter()
        .position(|&idx| edges[idx].class == EdgeClass::FalseBranch);
    if let (Some(t), Some(f)) = (true_pos, false_pos) {
        if t > f {
            slots.swap(t, f);
        }
    }
}

/// Rectangular detour on the node's right side; loop `index` of `total`
/// nests outside the previous ones.
pub(super) fn route_self_loop(
    node: &LayoutNode,
    index: usize,
    total: usize,
    config: &LayoutConfig,
) -> Vec<Point> {
    let right = node.x + node.width;
    let reach = right + config.self_loop_pad() + index as f32 * config.channel_spacing();
    let center_y = node.rect().center_y();
    let step = config
        .channel_spacing()
        .min(node.height * SELF_LOOP_STEP_RATIO / (total + 1) as f32);
    let rise = (index + 1) as f32 * step;
    let exit_y = center_y - rise;
    let entry_y = center_y + rise;
    vec![
        Point::new(right, exit_y),
        Point::new(reach, exit_y),
        Point::new(reach, entry_y),
        Point::new(right, entry_y),
    ]
}

/// Drops repeated points and interior points on a straight run.
pub(super) fn simplify_polyline(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last() == Some(&p) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let collinear = (a.x == b.x && b.x == p.x) || (a.y == b.y && b.y == p.y);
            if collinear {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

/// Whether the axis-aligned segment `a`-`b` passes through the interior of
/// `rect` (touching the outline does not count).
pub(crate) fn segment_enters_rect(a: Point, b: Point, rect: &Rect, eps: f32) -> bool {
    let min_x = a.x.min(b.x);
    let max_x = a.x.max(b.x);
    let min_y = a.y.min(b.y);
    let max_y = a.y.max(b.y);
    let inner_left = rect.x + eps;
    let inner_right = rect.right() - eps;
    let inner_top = rect.y + eps;
    let inner_bottom = rect.bottom() - eps;
    if inner_left >= inner_right || inner_top >= inner_bottom {
        return false;
    }
    max_x > inner_left && min_x < inner_right && max_y > inner_top && min_y < inner_bottom
}
