//! Feedback-edge detection.
//!
//! Depth-first search from every in-degree-zero node (input order), then from
//! the first still-unvisited node until every node has been reached. An edge
//! whose target is on the current DFS path closes a cycle and is marked as a
//! back edge. The walk uses an explicit frame stack so deep control-flow
//! chains cannot exhaust the call stack.

use super::LogicalEdge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnPath,
    Done,
}

/// Output of cycle breaking: per-edge back flags plus DAG adjacency.
#[derive(Debug, Clone, Default)]
pub(super) struct Acyclic {
    pub(super) back: Vec<bool>,
    /// Deduplicated DAG successors, in first-seen successor order.
    pub(super) succ: Vec<Vec<usize>>,
    pub(super) pred: Vec<Vec<usize>>,
}

impl Acyclic {
    pub(super) fn back_edge_count(&self) -> usize {
        self.back.iter().filter(|b| **b).count()
    }
}

pub(super) fn break_cycles(
    node_count: usize,
    edges: &[LogicalEdge],
    out_edges: &[Vec<usize>],
) -> Acyclic {
    let mut back = vec![false; edges.len()];
    let mut state = vec![Visit::Unvisited; node_count];

    let mut in_degree = vec![0usize; node_count];
    for edge in edges {
        in_degree[edge.target] += 1;
    }

    // (node, index of the next outgoing edge to look at)
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut visit_from = |root: usize, state: &mut Vec<Visit>, back: &mut Vec<bool>| {
        if state[root] != Visit::Unvisited {
            return;
        }
        state[root] = Visit::OnPath;
        stack.push((root, 0));
        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let Some(&edge_idx) = out_edges[node].get(next) else {
                state[node] = Visit::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;
            let target = edges[edge_idx].target;
            match state[target] {
                Visit::OnPath => back[edge_idx] = true,
                Visit::Unvisited => {
                    state[target] = Visit::OnPath;
                    stack.push((target, 0));
                }
                Visit::Done => {}
            }
        }
    };

    for root in 0..node_count {
        if in_degree[root] == 0 {
            visit_from(root, &mut state, &mut back);
        }
    }
    for root in 0..node_count {
        visit_from(root, &mut state, &mut back);
    }

    let mut succ: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut pred: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for (edge, is_back) in edges.iter().zip(&back) {
        if *is_back {
            continue;
        }
        if !succ[edge.source].contains(&edge.target) {
            succ[edge.source].push(edge.target);
            pred[edge.target].push(edge.source);
        }
    }

    Acyclic { back, succ, pred }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::EdgeClass;

    fn edges_of(
        node_count: usize,
        pairs: &[(usize, usize)],
    ) -> (Vec<LogicalEdge>, Vec<Vec<usize>>) {
        let edges: Vec<LogicalEdge> = pairs
            .iter()
            .map(|&(source, target)| LogicalEdge {
                source,
                target,
                class: EdgeClass::Plain,
            })
            .collect();
        let mut out = vec![Vec::new(); node_count];
        for (idx, edge) in edges.iter().enumerate() {
            out[edge.source].push(idx);
        }
        (edges, out)
    }

    fn is_acyclic(node_count: usize, succ: &[Vec<usize>]) -> bool {
        let mut indegree = vec![0usize; node_count];
        for list in succ {
            for &t in list {
                indegree[t] += 1;
            }
        }
        let mut queue: Vec<usize> = (0..node_count).filter(|&n| indegree[n] == 0).collect();
        let mut seen = 0;
        while let Some(n) = queue.pop() {
            seen += 1;
            for &t in &succ[n] {
                indegree[t] -= 1;
                if indegree[t] == 0 {
                    queue.push(t);
                }
            }
        }
        seen == node_count
    }

    #[test]
    fn chain_has_no_back_edges() {
        let (edges, out) = edges_of(3, &[(0, 1), (1, 2)]);
        let acyclic = break_cycles(3, &edges, &out);
        assert_eq!(acyclic.back_edge_count(), 0);
        assert_eq!(acyclic.succ[0], vec![1]);
        assert_eq!(acyclic.pred[2], vec![1]);
    }

    #[test]
    fn two_cycle_keeps_root_edge() {
        let (edges, out) = edges_of(2, &[(0, 1), (1, 0)]);
        let acyclic = break_cycles(2, &edges, &out);
        assert_eq!(acyclic.back, vec![false, true]);
    }

    #[test]
    fn self_loop_is_back_edge() {
        let (edges, out) = edges_of(1, &[(0, 0)]);
        let acyclic = break_cycles(1, &edges, &out);
        assert_eq!(acyclic.back, vec![true]);
        assert!(acyclic.succ[0].is_empty());
    }

    #[test]
    fn rootless_cycle_starts_at_first_node() {
        // 0 -> 1 -> 2 -> 0, every node has in-degree one.
        let (edges, out) = edges_of(3, &[(0, 1), (1, 2), (2, 0)]);
        let acyclic = break_cycles(3, &edges, &out);
        assert_eq!(acyclic.back, vec![false, false, true]);
    }

    #[test]
    fn cross_edges_are_not_back_edges() {
        // Diamond: the second visit of 3 happens after it finished.
        let (edges, out) = edges_of(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let acyclic = break_cycles(4, &edges, &out);
        assert_eq!(acyclic.back_edge_count(), 0);
        assert_eq!(acyclic.pred[3], vec![1, 2]);
    }

    #[test]
    fn duplicate_edges_collapse_in_dag() {
        let (edges, out) = edges_of(2, &[(0, 1), (0, 1)]);
        let acyclic = break_cycles(2, &edges, &out);
        assert_eq!(acyclic.back_edge_count(), 0);
        assert_eq!(acyclic.succ[0], vec![1]);
        assert_eq!(acyclic.pred[1], vec![0]);
    }

    #[test]
    fn nested_loops_and_disconnected_parts() {
        let pairs = [
            (0, 1),
            (1, 2),
            (2, 1),
            (2, 3),
            (3, 0),
            (4, 5),
            (5, 4),
            (6, 6),
        ];
        let (edges, out) = edges_of(7, &pairs);
        let acyclic = break_cycles(7, &edges, &out);
        assert!(is_acyclic(7, &acyclic.succ));
        assert!(acyclic.back[2]);
        assert!(acyclic.back[4]);
        assert!(acyclic.back[7]);
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let n = 50_000;
        let pairs: Vec<(usize, usize)> = (0..n - 1).map(|i| (i, i + 1)).collect();
        let (edges, out) = edges_of(n, &pairs);
        let acyclic = break_cycles(n, &edges, &out);
        assert_eq!(acyclic.back_edge_count(), 0);
    }
}
