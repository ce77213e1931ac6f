use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use flowgraph_layout::layout_dump::write_layout_dump;
use flowgraph_layout::{
    EdgeClass, Graph, GraphKind, LayoutConfig, LayoutResult, Node, NodeId, compute_layout,
};

const EPS: f32 = 1e-3;

fn fixture(rel: &str) -> (PathBuf, Graph) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel);
    let graph = Graph::from_path(&path).expect("fixture load failed");
    (path, graph)
}

fn configs() -> Vec<(&'static str, LayoutConfig)> {
    vec![
        ("default", LayoutConfig::default()),
        (
            "tight",
            LayoutConfig {
                node_gap: 4.0,
                layer_gap: 8.0,
                channel_spacing: 20.0,
                flank_margin: 2.0,
                self_loop_pad: 3.0,
                ..LayoutConfig::default()
            },
        ),
        (
            "wide",
            LayoutConfig {
                node_gap: 120.0,
                layer_gap: 150.0,
                channel_spacing: 3.0,
                flank_margin: 80.0,
                ..LayoutConfig::default()
            },
        ),
        (
            "unrefined",
            LayoutConfig {
                order_passes: 0,
                relax_passes: 0,
                ..LayoutConfig::default()
            },
        ),
    ]
}

fn assert_invariants(label: &str, graph: &Graph, config: &LayoutConfig, result: &LayoutResult) {
    // Layer contiguity.
    let layers: BTreeSet<usize> = result.nodes.iter().map(|n| n.layer).collect();
    if let Some(&max) = layers.iter().next_back() {
        assert_eq!(layers.len(), max + 1, "{label}: layers not contiguous: {layers:?}");
    }

    // No overlap inside a layer.
    for &l in &layers {
        let mut row: Vec<_> = result.nodes.iter().filter(|n| n.layer == l).collect();
        row.sort_by_key(|n| n.order);
        for pair in row.windows(2) {
            assert!(
                pair[0].x + pair[0].width + config.node_gap <= pair[1].x + EPS,
                "{label}: nodes {} and {} overlap on layer {l}",
                pair[0].id,
                pair[1].id
            );
        }
    }

    let ids: BTreeSet<NodeId> = graph.nodes.iter().map(|n| n.id).collect();
    for edge in &result.edges {
        assert!(ids.contains(&edge.source) && ids.contains(&edge.target), "{label}: unknown id");
        assert!(edge.points.len() >= 2, "{label}: degenerate edge {edge:?}");
        assert!(edge.is_orthogonal(), "{label}: diagonal segment in {:?}", edge.points);

        let source = result.node(edge.source).expect("source laid out");
        let target = result.node(edge.target).expect("target laid out");
        let first = edge.points[0];
        let last = edge.points[edge.points.len() - 1];
        assert!(
            source.rect().on_boundary(first, EPS),
            "{label}: {first:?} off source {}",
            source.id
        );
        assert!(target.rect().on_boundary(last, EPS), "{label}: {last:?} off target {}", target.id);

        if edge.is_self_loop() {
            let right = source.x + source.width;
            assert!(edge.is_back_edge);
            assert!(edge.points.len() >= 4);
            assert!((first.x - right).abs() <= EPS && (last.x - right).abs() <= EPS);
        }
    }

    assert_eq!(result.node_intrusions(), 0, "{label}: an edge crosses a node body");

    let clashes = coincident_horizontal_runs(result);
    assert!(clashes.is_empty(), "{label}: edges share a channel: {clashes:?}");
    for &l in &layers {
        let mut lanes = band_lane_xs(result, l);
        lanes.sort_by(|a, b| a.1.total_cmp(&b.1));
        for pair in lanes.windows(2) {
            assert!(
                pair[1].1 - pair[0].1 > EPS,
                "{label}: edges {} and {} share a lane through layer {l}",
                pair[0].0,
                pair[1].0
            );
        }
    }
}

/// Pairs of different edges whose horizontal runs sit at the same y and
/// overlap in x.
fn coincident_horizontal_runs(result: &LayoutResult) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    for (idx, edge) in result.edges.iter().enumerate() {
        for seg in edge.points.windows(2) {
            if (seg[0].y - seg[1].y).abs() <= EPS && (seg[0].x - seg[1].x).abs() > EPS {
                runs.push((idx, seg[0].y, seg[0].x.min(seg[1].x), seg[0].x.max(seg[1].x)));
            }
        }
    }
    let mut clashes = Vec::new();
    for (i, a) in runs.iter().enumerate() {
        for b in &runs[i + 1..] {
            let overlap = a.3.min(b.3) - a.2.max(b.2);
            if a.0 != b.0 && (a.1 - b.1).abs() <= EPS && overlap > EPS {
                clashes.push((a.0, b.0));
            }
        }
    }
    clashes
}

/// `(edge index, x)` of every vertical run that crosses the whole band of
/// `layer`.
fn band_lane_xs(result: &LayoutResult, layer: usize) -> Vec<(usize, f32)> {
    let row: Vec<_> = result.nodes.iter().filter(|n| n.layer == layer).collect();
    let Some(top) = row.iter().map(|n| n.y).reduce(f32::min) else {
        return Vec::new();
    };
    let bottom = row.iter().map(|n| n.y + n.height).fold(top, f32::max);
    let mut lanes = Vec::new();
    for (idx, edge) in result.edges.iter().enumerate() {
        for seg in edge.points.windows(2) {
            let vertical = (seg[0].x - seg[1].x).abs() <= EPS;
            let (lo, hi) = (seg[0].y.min(seg[1].y), seg[0].y.max(seg[1].y));
            if vertical && lo <= top + EPS && hi >= bottom - EPS {
                lanes.push((idx, seg[0].x));
            }
        }
    }
    lanes
}

#[test]
fn fixtures_hold_layout_invariants() {
    for rel in ["loop.json", "diamond.json", "switch.json", "callgraph.json"] {
        let (_, graph) = fixture(rel);
        for (name, config) in configs() {
            let label = format!("{rel}/{name}");
            let result = compute_layout(&graph, &config);
            assert_invariants(&label, &graph, &config, &result);
            assert_eq!(result, compute_layout(&graph, &config), "{label}: not deterministic");
        }
    }
}

#[test]
fn loop_fixture_routes_latch_as_back_edge() {
    let (_, graph) = fixture("loop.json");
    let result = compute_layout(&graph, &LayoutConfig::default());
    assert_eq!(result.stats.back_edges, 1);

    let latch = result
        .edges
        .iter()
        .find(|e| e.source == NodeId(2) && e.target == NodeId(1))
        .unwrap();
    assert!(latch.is_back_edge);
    assert_eq!(latch.points.len(), 6);

    let taken = result
        .edges
        .iter()
        .find(|e| e.source == NodeId(1) && e.target == NodeId(3))
        .unwrap();
    let fallthrough = result
        .edges
        .iter()
        .find(|e| e.source == NodeId(1) && e.target == NodeId(2))
        .unwrap();
    assert_eq!(taken.class, EdgeClass::TrueBranch);
    assert_eq!(fallthrough.class, EdgeClass::FalseBranch);
    assert!(taken.points[0].x < fallthrough.points[0].x);
}

#[test]
fn switch_fixture_counts_loops_and_dangling_targets() {
    let (_, graph) = fixture("switch.json");
    let result = compute_layout(&graph, &LayoutConfig::default());
    assert_eq!(result.stats.self_loops, 1);
    assert_eq!(result.stats.back_edges, 2);
    assert_eq!(result.stats.dropped_edges, 1);
    assert_eq!(result.edges.len(), graph.edge_count() - 1);
    assert!(result.edges.iter().all(|e| e.class == EdgeClass::Plain));
}

#[test]
fn callgraph_fixture_keeps_first_duplicate() {
    let (_, graph) = fixture("callgraph.json");
    assert_eq!(graph.kind, GraphKind::CallGraph);
    let result = compute_layout(&graph, &LayoutConfig::default());
    assert_eq!(result.stats.duplicate_nodes, 1);
    assert_eq!(result.nodes.len(), 8);
    assert_eq!(result.node(NodeId(107)).map(|n| n.layer), Some(0));
    assert_eq!(result.stats.self_loops, 1);
}

#[test]
fn long_edges_thread_every_gap() {
    // 1 -> 2 -> 3 -> 4 plus a shortcut 1 -> 4 spanning two middle layers.
    let mut graph = Graph::new(GraphKind::FunctionFlow);
    graph.push(Node::new(1, "head").with_successors(&[2, 4]));
    graph.push(Node::new(2, "b").with_successors(&[3]));
    graph.push(Node::new(3, "c").with_successors(&[4]));
    graph.push(Node::new(4, "tail"));
    let config = LayoutConfig::default();
    let result = compute_layout(&graph, &config);
    assert_invariants("shortcut", &graph, &config, &result);

    let shortcut = result
        .edges
        .iter()
        .find(|e| e.source == NodeId(1) && e.target == NodeId(4))
        .unwrap();
    assert!(!shortcut.is_back_edge);
    let middle: Vec<_> = result.nodes.iter().filter(|n| n.layer == 1 || n.layer == 2).collect();
    for node in middle {
        let x_range = node.x..=node.x + node.width;
        let passes_through = shortcut.points.windows(2).any(|seg| {
            seg[0].x == seg[1].x
                && x_range.contains(&seg[0].x)
                && seg[0].y < node.y + node.height
                && seg[1].y > node.y
        });
        assert!(!passes_through, "shortcut crosses {}", node.id);
    }
}

#[test]
fn crowded_lane_keeps_long_edges_apart() {
    // Twelve sources skip over `mid` to reach `tail`; with a narrow node gap
    // they all squeeze through the two outer intervals of the middle layer.
    let mut graph = Graph::new(GraphKind::FunctionFlow);
    for id in 1..=12 {
        graph.push(Node::new(id, format!("src_{id}")).with_successors(&[100]));
    }
    graph.push(Node::new(50, "head").with_successors(&[60]));
    graph.push(Node::new(60, "mid").with_successors(&[100]));
    graph.push(Node::new(100, "tail"));
    let config = LayoutConfig {
        node_gap: 4.0,
        ..LayoutConfig::default()
    };
    let result = compute_layout(&graph, &config);
    assert_eq!(result.node(NodeId(60)).map(|n| n.layer), Some(1));
    assert_eq!(result.node(NodeId(100)).map(|n| n.layer), Some(2));
    assert_invariants("crowded", &graph, &config, &result);

    let mut lanes: Vec<f32> = band_lane_xs(&result, 1).into_iter().map(|(_, x)| x).collect();
    assert_eq!(lanes.len(), 12);
    lanes.sort_by(f32::total_cmp);
    for pair in lanes.windows(2) {
        assert!(pair[1] - pair[0] > EPS, "lanes collapsed: {lanes:?}");
    }
}

#[test]
fn dump_file_is_written() {
    let (_, graph) = fixture("diamond.json");
    let result = compute_layout(&graph, &LayoutConfig::default());
    let path = std::env::temp_dir().join(format!("fgl-dump-{}.json", std::process::id()));
    write_layout_dump(&path, &result, &graph).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["kind"], "functionFlow");
    assert_eq!(value["edges"].as_array().map(Vec::len), Some(4));
    let _ = std::fs::remove_file(&path);
}
