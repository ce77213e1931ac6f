use serde::Serialize;

use crate::config::NodeMetrics;
use crate::ir::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether `p` lies on the rectangle outline, within `eps`.
    pub fn on_boundary(&self, p: Point, eps: f32) -> bool {
        let within_x = p.x >= self.x - eps && p.x <= self.right() + eps;
        let within_y = p.y >= self.y - eps && p.y <= self.bottom() + eps;
        let on_vertical = within_y
            && ((p.x - self.x).abs() <= eps || (p.x - self.right()).abs() <= eps);
        let on_horizontal = within_x
            && ((p.y - self.y).abs() <= eps || (p.y - self.bottom()).abs() <= eps);
        on_vertical || on_horizontal
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: NodeId,
    pub address: u64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub layer: usize,
    /// Position within the layer after ordering, left to right.
    pub order: usize,
    /// Instruction rows shown (and hit-testable), at most the configured cap.
    pub instruction_rows: usize,
}

impl LayoutNode {
    pub fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeClass {
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "true")]
    TrueBranch,
    #[serde(rename = "false")]
    FalseBranch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub source: NodeId,
    pub target: NodeId,
    /// Orthogonal polyline; the arrowhead sits at the last point.
    pub points: Vec<Point>,
    pub class: EdgeClass,
    pub is_back_edge: bool,
}

impl RoutedEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn is_orthogonal(&self) -> bool {
        self.points
            .windows(2)
            .all(|seg| seg[0].x == seg[1].x || seg[0].y == seg[1].y)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStats {
    pub layers: usize,
    pub back_edges: usize,
    pub self_loops: usize,
    pub dropped_edges: usize,
    pub duplicate_nodes: usize,
    /// Crossings between DAG edges of adjacent layers after ordering.
    pub crossings: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<RoutedEdge>,
    pub stats: LayoutStats,
    pub metrics: NodeMetrics,
}

impl LayoutResult {
    pub fn empty(metrics: NodeMetrics) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            stats: LayoutStats::default(),
            metrics,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&LayoutNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Bounding box of nodes and edge waypoints; `None` for an empty layout.
    pub fn bounds(&self) -> Option<Rect> {
        let mut rects = self.nodes.iter().map(LayoutNode::rect).chain(
            self.edges
                .iter()
                .flat_map(|edge| edge.points.iter())
                .map(|p| Rect {
                    x: p.x,
                    y: p.y,
                    width: 0.0,
                    height: 0.0,
                }),
        );
        let first = rects.next()?;
        Some(rects.fold(first, |acc, rect| acc.union(&rect)))
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        for node in &mut self.nodes {
            node.x += dx;
            node.y += dy;
        }
        for edge in &mut self.edges {
            for point in &mut edge.points {
                point.x += dx;
                point.y += dy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_detection() {
        let rect = Rect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 20.0,
        };
        assert!(rect.on_boundary(Point::new(5.0, 0.0), 0.01));
        assert!(rect.on_boundary(Point::new(10.0, 12.0), 0.01));
        assert!(!rect.on_boundary(Point::new(5.0, 5.0), 0.01));
        assert!(!rect.on_boundary(Point::new(15.0, 20.0), 0.01));
    }

    #[test]
    fn bounds_include_edge_points() {
        let mut result = LayoutResult::empty(NodeMetrics::default());
        assert!(result.bounds().is_none());
        result.nodes.push(LayoutNode {
            id: NodeId(1),
            address: 0,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            layer: 0,
            order: 0,
            instruction_rows: 0,
        });
        result.edges.push(RoutedEdge {
            source: NodeId(1),
            target: NodeId(1),
            points: vec![Point::new(10.0, 2.0), Point::new(30.0, 2.0)],
            class: EdgeClass::Plain,
            is_back_edge: true,
        });
        let bounds = result.bounds().unwrap();
        assert_eq!(bounds.width, 30.0);
        result.translate(5.0, -1.0);
        assert_eq!(result.nodes[0].x, 5.0);
        assert_eq!(result.edges[0].points[1], Point::new(35.0, 1.0));
    }
}
