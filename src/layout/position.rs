use std::cmp::Ordering;

use crate::config::LayoutConfig;

/// Geometry produced by coordinate assignment, indexed by dense node index.
#[derive(Debug, Clone, Default)]
pub(super) struct Placement {
    pub(super) x: Vec<f32>,
    pub(super) y: Vec<f32>,
    /// Layer bands: nodes of layer `l` are top-aligned at `layer_top[l]` and
    /// end at or above `layer_bottom[l]`.
    pub(super) layer_top: Vec<f32>,
    pub(super) layer_bottom: Vec<f32>,
    /// Final left-to-right order within each layer.
    pub(super) buckets: Vec<Vec<usize>>,
}

pub(super) struct PlacementInput<'a> {
    pub(super) buckets: Vec<Vec<usize>>,
    pub(super) width: &'a [f32],
    pub(super) height: &'a [f32],
    /// Width plus any room reserved to the right (self-loop detours).
    pub(super) footprint: &'a [f32],
    pub(super) succ: &'a [Vec<usize>],
    pub(super) pred: &'a [Vec<usize>],
}

pub(super) fn assign_coordinates(input: PlacementInput<'_>, config: &LayoutConfig) -> Placement {
    let PlacementInput {
        mut buckets,
        width,
        height,
        footprint,
        succ,
        pred,
    } = input;
    let n = width.len();
    let gap = config.node_gap();
    let mut x = vec![0.0f32; n];
    let mut y = vec![0.0f32; n];

    // Initial pass: each layer centered on x = 0, layers stacked downward.
    let mut layer_top = Vec::with_capacity(buckets.len());
    let mut layer_bottom = Vec::with_capacity(buckets.len());
    let mut top = 0.0f32;
    for bucket in &buckets {
        let total: f32 = bucket.iter().map(|&v| footprint[v]).sum::<f32>()
            + gap * bucket.len().saturating_sub(1) as f32;
        let mut cursor = -total / 2.0;
        let mut tallest = 0.0f32;
        for &v in bucket {
            x[v] = cursor;
            y[v] = top;
            cursor += footprint[v] + gap;
            tallest = tallest.max(height[v]);
        }
        layer_top.push(top);
        layer_bottom.push(top + tallest);
        top += tallest + config.layer_gap();
    }

    // Relaxation: alternate pulling toward predecessors and successors.
    let factor = config.relax_factor();
    for pass in 0..config.relax_passes {
        let top_down = pass % 2 == 0;
        let (neighbors, layers): (&[Vec<usize>], Vec<usize>) = if top_down {
            (pred, (0..buckets.len()).collect())
        } else {
            (succ, (0..buckets.len()).rev().collect())
        };
        for l in layers {
            let mut moved = false;
            for &v in &buckets[l] {
                let Some(target) = mean_center(&neighbors[v], &x, width) else {
                    continue;
                };
                let center = x[v] + width[v] / 2.0;
                let delta = (target - center) * factor;
                if delta != 0.0 {
                    x[v] += delta;
                    moved = true;
                }
            }
            if moved {
                resolve_layer_overlaps(&mut buckets[l], &mut x, footprint, gap);
            }
        }
    }

    Placement {
        x,
        y,
        layer_top,
        layer_bottom,
        buckets,
    }
}

fn mean_center(neighbors: &[usize], x: &[f32], width: &[f32]) -> Option<f32> {
    if neighbors.is_empty() {
        return None;
    }
    let sum: f32 = neighbors.iter().map(|&nb| x[nb] + width[nb] / 2.0).sum();
    Some(sum / neighbors.len() as f32)
}

/// Restores the minimum gap inside one layer: sort by x, push right where
/// needed, then translate the layer back so its mean position is unchanged.
pub(super) fn resolve_layer_overlaps(
    bucket: &mut [usize],
    x: &mut [f32],
    footprint: &[f32],
    gap: f32,
) {
    if bucket.len() < 2 {
        return;
    }
    bucket.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(Ordering::Equal));

    let before: f32 = bucket.iter().map(|&v| x[v]).sum();
    for i in 1..bucket.len() {
        let prev = bucket[i - 1];
        let cur = bucket[i];
        let min_x = x[prev] + footprint[prev] + gap;
        if x[cur] < min_x {
            x[cur] = min_x;
        }
    }
    let after: f32 = bucket.iter().map(|&v| x[v]).sum();
    let shift = (after - before) / bucket.len() as f32;
    if shift != 0.0 {
        for &v in bucket.iter() {
            x[v] -= shift;
        }
    }
}
