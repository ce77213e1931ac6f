use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Content-to-size parameters used when measuring nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    pub char_width: f32,
    pub line_height: f32,
    pub title_height: f32,
    pub padding_x: f32,
    pub padding_y: f32,
    pub min_width: f32,
    pub max_instructions: usize,
    pub show_addresses: bool,
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.5,
            line_height: 16.0,
            title_height: 24.0,
            padding_x: 10.0,
            padding_y: 8.0,
            min_width: 80.0,
            max_instructions: 64,
            show_addresses: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Horizontal gap between neighbouring nodes of one layer.
    pub node_gap: f32,
    /// Vertical gap between consecutive layers; edge channels live here.
    pub layer_gap: f32,
    pub channel_spacing: f32,
    /// Distance between the outermost node and the first back-edge flank lane.
    pub flank_margin: f32,
    pub self_loop_pad: f32,
    pub order_passes: usize,
    pub relax_passes: usize,
    pub relax_factor: f32,
    pub metrics: NodeMetrics,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_gap: 40.0,
            layer_gap: 60.0,
            channel_spacing: 8.0,
            flank_margin: 24.0,
            self_loop_pad: 16.0,
            order_passes: 4,
            relax_passes: 8,
            relax_factor: 0.5,
            metrics: NodeMetrics::default(),
        }
    }
}

impl LayoutConfig {
    pub(crate) fn node_gap(&self) -> f32 {
        self.node_gap.max(1.0)
    }

    pub(crate) fn layer_gap(&self) -> f32 {
        self.layer_gap.max(4.0)
    }

    pub(crate) fn channel_spacing(&self) -> f32 {
        self.channel_spacing.max(0.5)
    }

    pub(crate) fn flank_margin(&self) -> f32 {
        self.flank_margin.max(1.0)
    }

    pub(crate) fn self_loop_pad(&self) -> f32 {
        self.self_loop_pad.max(1.0)
    }

    pub(crate) fn relax_factor(&self) -> f32 {
        if self.relax_factor.is_finite() {
            self.relax_factor.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricsFile {
    char_width: Option<f32>,
    line_height: Option<f32>,
    title_height: Option<f32>,
    padding_x: Option<f32>,
    padding_y: Option<f32>,
    min_width: Option<f32>,
    max_instructions: Option<usize>,
    show_addresses: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    node_gap: Option<f32>,
    layer_gap: Option<f32>,
    channel_spacing: Option<f32>,
    flank_margin: Option<f32>,
    self_loop_pad: Option<f32>,
    order_passes: Option<usize>,
    relax_passes: Option<usize>,
    relax_factor: Option<f32>,
    metrics: Option<MetricsFile>,
}

/// Parses a JSON5 config document on top of the defaults. Keys that are
/// absent keep their default value.
pub fn parse_config(contents: &str) -> anyhow::Result<LayoutConfig> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = LayoutConfig::default();

    if let Some(v) = parsed.node_gap {
        config.node_gap = v;
    }
    if let Some(v) = parsed.layer_gap {
        config.layer_gap = v;
    }
    if let Some(v) = parsed.channel_spacing {
        config.channel_spacing = v;
    }
    if let Some(v) = parsed.flank_margin {
        config.flank_margin = v;
    }
    if let Some(v) = parsed.self_loop_pad {
        config.self_loop_pad = v;
    }
    if let Some(v) = parsed.order_passes {
        config.order_passes = v;
    }
    if let Some(v) = parsed.relax_passes {
        config.relax_passes = v;
    }
    if let Some(v) = parsed.relax_factor {
        config.relax_factor = v;
    }

    if let Some(metrics) = parsed.metrics {
        let target = &mut config.metrics;
        if let Some(v) = metrics.char_width {
            target.char_width = v;
        }
        if let Some(v) = metrics.line_height {
            target.line_height = v;
        }
        if let Some(v) = metrics.title_height {
            target.title_height = v;
        }
        if let Some(v) = metrics.padding_x {
            target.padding_x = v;
        }
        if let Some(v) = metrics.padding_y {
            target.padding_y = v;
        }
        if let Some(v) = metrics.min_width {
            target.min_width = v;
        }
        if let Some(v) = metrics.max_instructions {
            target.max_instructions = v;
        }
        if let Some(v) = metrics.show_addresses {
            target.show_addresses = v;
        }
    }

    Ok(config)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, LayoutConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config = parse_config(
            r#"{
                // density tweaks
                nodeGap: 12,
                relaxPasses: 2,
                metrics: { charWidth: 6.0, showAddresses: false, },
            }"#,
        )
        .unwrap();
        assert_eq!(config.node_gap, 12.0);
        assert_eq!(config.relax_passes, 2);
        assert_eq!(config.layer_gap, LayoutConfig::default().layer_gap);
        assert_eq!(config.metrics.char_width, 6.0);
        assert!(!config.metrics.show_addresses);
        assert_eq!(config.metrics.line_height, NodeMetrics::default().line_height);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(parse_config(r#"{ "nodeGap": "wide" }"#).is_err());
    }

    #[test]
    fn accessors_clamp_degenerate_values() {
        let config = LayoutConfig {
            node_gap: -5.0,
            layer_gap: 0.0,
            channel_spacing: 0.0,
            relax_factor: f32::NAN,
            ..LayoutConfig::default()
        };
        assert!(config.node_gap() > 0.0);
        assert!(config.layer_gap() > 0.0);
        assert!(config.channel_spacing() > 0.0);
        assert_eq!(config.relax_factor(), 0.0);
    }
}
