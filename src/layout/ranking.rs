use std::cmp::Ordering;
use std::collections::VecDeque;

/// Longest-path layering over the DAG adjacency.
///
/// Nodes without DAG predecessors sit on layer 0; every other node sits one
/// layer below its deepest predecessor, so every DAG edge points strictly
/// downward and the used layers are contiguous.
pub(super) fn assign_layers(succ: &[Vec<usize>], pred: &[Vec<usize>]) -> Vec<usize> {
    let n = succ.len();
    let mut remaining: Vec<usize> = pred.iter().map(Vec::len).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&v| remaining[v] == 0).collect();
    let mut layer = vec![0usize; n];

    while let Some(u) = queue.pop_front() {
        for &v in &succ[u] {
            layer[v] = layer[v].max(layer[u] + 1);
            remaining[v] -= 1;
            if remaining[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    layer
}

/// Buckets node indices by layer, keeping input order inside each bucket.
pub(super) fn build_layer_buckets(layer: &[usize]) -> Vec<Vec<usize>> {
    let Some(max_layer) = layer.iter().copied().max() else {
        return Vec::new();
    };
    let mut buckets = vec![Vec::new(); max_layer + 1];
    for (node, &l) in layer.iter().enumerate() {
        buckets[l].push(node);
    }
    buckets
}

fn update_positions(buckets: &[Vec<usize>], positions: &mut [usize]) {
    for bucket in buckets {
        for (idx, &node) in bucket.iter().enumerate() {
            positions[node] = idx;
        }
    }
}

/// Mean position of `neighbors` that live on `adjacent_layer`; `None` when none do.
fn barycenter(
    neighbors: &[usize],
    layer: &[usize],
    adjacent_layer: usize,
    positions: &[usize],
) -> Option<f32> {
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for &nb in neighbors {
        if layer[nb] == adjacent_layer {
            sum += positions[nb] as f32;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f32)
}

fn sort_bucket(
    bucket: &mut [usize],
    neighbors: &[Vec<usize>],
    layer: &[usize],
    adjacent_layer: usize,
    positions: &[usize],
) {
    // Stable: equal and undefined scores keep their current relative order.
    bucket.sort_by(|&a, &b| {
        let a_score = barycenter(&neighbors[a], layer, adjacent_layer, positions);
        let b_score = barycenter(&neighbors[b], layer, adjacent_layer, positions);
        match (a_score, b_score) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// Iterative barycenter crossing reduction: `passes` rounds of a top-down
/// sweep (predecessors on the layer above) followed by a bottom-up sweep
/// (successors on the layer below).
pub(super) fn order_layers(
    buckets: &mut [Vec<usize>],
    layer: &[usize],
    succ: &[Vec<usize>],
    pred: &[Vec<usize>],
    passes: usize,
) {
    if buckets.len() <= 1 {
        return;
    }
    let mut positions = vec![0usize; layer.len()];
    update_positions(buckets, &mut positions);

    for _ in 0..passes {
        for l in 1..buckets.len() {
            if buckets[l].len() > 1 {
                sort_bucket(&mut buckets[l], pred, layer, l - 1, &positions);
                update_positions(&buckets[l..=l], &mut positions);
            }
        }
        for l in (0..buckets.len() - 1).rev() {
            if buckets[l].len() > 1 {
                sort_bucket(&mut buckets[l], succ, layer, l + 1, &positions);
                update_positions(&buckets[l..=l], &mut positions);
            }
        }
    }
}

/// Counts pairwise crossings of DAG edges between adjacent layers.
pub(super) fn count_crossings(
    buckets: &[Vec<usize>],
    layer: &[usize],
    succ: &[Vec<usize>],
) -> usize {
    let mut positions = vec![0usize; layer.len()];
    update_positions(buckets, &mut positions);

    let mut total = 0usize;
    for l in 0..buckets.len().saturating_sub(1) {
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for &u in &buckets[l] {
            for &v in &succ[u] {
                if layer[v] == l + 1 {
                    pairs.push((positions[u], positions[v]));
                }
            }
        }
        for i in 0..pairs.len() {
            for j in (i + 1)..pairs.len() {
                let (a1, b1) = pairs[i];
                let (a2, b2) = pairs[j];
                if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                    total += 1;
                }
            }
        }
    }
    total
}
