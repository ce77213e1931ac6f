use crate::ir::{Graph, GraphKind};
use crate::layout::{EdgeClass, LayoutResult, LayoutStats, Point};
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Renderer-facing view of a layout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub kind: GraphKind,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub stats: LayoutStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: i64,
    pub address: u64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub layer: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub source: i64,
    pub target: i64,
    pub points: Vec<Point>,
    pub class: EdgeClass,
    pub is_back_edge: bool,
}

impl LayoutDump {
    pub fn from_layout(layout: &LayoutResult, graph: &Graph) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.0,
                address: node.address,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                layer: node.layer,
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                source: edge.source.0,
                target: edge.target.0,
                points: edge.points.clone(),
                class: edge.class,
                is_back_edge: edge.is_back_edge,
            })
            .collect();

        let (width, height) = layout
            .bounds()
            .map(|b| (b.width, b.height))
            .unwrap_or((0.0, 0.0));

        LayoutDump {
            kind: graph.kind,
            width,
            height,
            nodes,
            edges,
            stats: layout.stats.clone(),
        }
    }
}

pub fn write_layout_json<W: Write>(
    writer: W,
    layout: &LayoutResult,
    graph: &Graph,
    pretty: bool,
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, graph);
    if pretty {
        serde_json::to_writer_pretty(writer, &dump)?;
    } else {
        serde_json::to_writer(writer, &dump)?;
    }
    Ok(())
}

pub fn write_layout_dump(path: &Path, layout: &LayoutResult, graph: &Graph) -> anyhow::Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_layout_json(&mut writer, layout, graph, true)?;
    writer.flush()?;
    Ok(())
}
