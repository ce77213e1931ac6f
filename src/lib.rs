#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod text_metrics;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{LayoutConfig, NodeMetrics, load_config, parse_config};
pub use ir::{Graph, GraphError, GraphKind, Instruction, InstructionClass, Node, NodeId};
pub use layout::{
    EdgeClass, LayoutNode, LayoutResult, LayoutStats, Point, Rect, RoutedEdge, compute_layout,
};
