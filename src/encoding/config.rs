use std::collections::BTreeMap;

use serde::Deserialize;

pub const DEFAULT_NODE_COLOR: &str = "#94A3B8";
pub const DEFAULT_EDGE_COLOR: &str = "#CBD5E1";
pub const TRANSPARENT: &str = "transparent";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VisualConfig {
    pub layout: LayoutConfig,
    pub node_color: NodeColorStrategy,
    pub node_size: NodeSizeStrategy,
    pub node_border: Option<NodeBorderConfig>,
    pub edge_color: EdgeColorStrategy,
    pub edge_size: EdgeSizeStrategy,
    pub labels: LabelConfig,
}

impl VisualConfig {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum NodeColorStrategy {
    Fixed {
        color: String,
    },
    #[serde(rename_all = "kebab-case")]
    ByGroup {
        #[serde(default)]
        palette: BTreeMap<String, String>,
        #[serde(default)]
        default_color: Option<String>,
    },
    #[serde(rename_all = "kebab-case")]
    ByStatus {
        status_colors: BTreeMap<String, String>,
        #[serde(default)]
        default_color: Option<String>,
    },
    #[serde(rename_all = "kebab-case")]
    ByMetricGradient {
        metric_key: String,
        gradient_start: String,
        gradient_end: String,
    },
}

impl Default for NodeColorStrategy {
    fn default() -> Self {
        Self::ByGroup {
            palette: BTreeMap::new(),
            default_color: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum NodeSizeStrategy {
    Fixed {
        size: f32,
    },
    #[serde(rename_all = "kebab-case")]
    ByType {
        type_sizes: BTreeMap<String, f32>,
        #[serde(default)]
        default_size: Option<f32>,
    },
    #[serde(rename_all = "kebab-case")]
    ByMetric {
        metric_key: String,
        min: f32,
        max: f32,
    },
    #[serde(rename_all = "kebab-case")]
    ByDegree {
        min: f32,
        max: f32,
        #[serde(default)]
        base_by_type: BTreeMap<String, f32>,
    },
    ByRole,
}

impl Default for NodeSizeStrategy {
    fn default() -> Self {
        Self::ByRole
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeBorderConfig {
    pub status_colors: BTreeMap<String, String>,
    pub default_color: String,
    #[serde(default = "default_border_ratio")]
    pub ratio: f32,
}

fn default_border_ratio() -> f32 {
    0.15
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum EdgeColorStrategy {
    Fixed {
        color: String,
    },
    #[serde(rename_all = "kebab-case")]
    ByType {
        type_colors: BTreeMap<String, String>,
        #[serde(default)]
        default_color: Option<String>,
    },
    BySource,
    ByGroup,
}

impl Default for EdgeColorStrategy {
    fn default() -> Self {
        Self::ByGroup
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum EdgeSizeStrategy {
    Default,
    Fixed {
        size: f32,
    },
    ByWeight {
        min: f32,
        max: f32,
    },
    #[serde(rename_all = "kebab-case")]
    ByMetric {
        metric_key: String,
        min: f32,
        max: f32,
    },
}

impl Default for EdgeSizeStrategy {
    fn default() -> Self {
        Self::Default
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    #[default]
    Force,
    Circular,
    Random,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    #[default]
    Continuous,
    Batch,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LayoutConfig {
    pub kind: LayoutKind,
    pub mode: LayoutMode,
    pub seed_by_group: bool,
    pub force: ForceParams,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            kind: LayoutKind::Force,
            mode: LayoutMode::Continuous,
            seed_by_group: false,
            force: ForceParams::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ForceParams {
    pub link_distance: f32,
    /// Negative values repel.
    pub charge: f32,
    pub collision_margin: f32,
    pub center_strength: f32,
    pub iterations: usize,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            link_distance: 120.0,
            charge: -300.0,
            collision_margin: 4.0,
            center_strength: 0.05,
            iterations: 150,
            alpha_decay: 0.0228,
            velocity_decay: 0.4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LabelConfig {
    pub show_node_labels: bool,
    pub show_edge_labels: bool,
    pub force_label_types: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            show_node_labels: true,
            show_edge_labels: false,
            force_label_types: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_strategies() {
        let config = VisualConfig::from_json(
            r##"{
                "node-color": {"strategy": "by-metric-gradient", "metric-key": "alarms",
                               "gradient-start": "#000000", "gradient-end": "#ffffff"},
                "node-size": {"strategy": "by-degree", "min": 6, "max": 24,
                              "base-by-type": {"source": 14}},
                "edge-size": {"strategy": "by-weight", "min": 0.5, "max": 4},
                "layout": {"kind": "circular", "mode": "batch", "seed-by-group": true}
            }"##,
        )
        .expect("valid config");

        assert_eq!(
            config.node_color,
            NodeColorStrategy::ByMetricGradient {
                metric_key: "alarms".into(),
                gradient_start: "#000000".into(),
                gradient_end: "#ffffff".into(),
            }
        );
        assert!(matches!(
            config.node_size,
            NodeSizeStrategy::ByDegree { ref base_by_type, .. } if base_by_type["source"] == 14.0
        ));
        assert_eq!(config.layout.kind, LayoutKind::Circular);
        assert_eq!(config.layout.mode, LayoutMode::Batch);
        assert_eq!(config.layout.force.iterations, 150);
        assert_eq!(config.edge_color, EdgeColorStrategy::ByGroup);
    }

    #[test]
    fn empty_object_uses_defaults() {
        let config = VisualConfig::from_json("{}").expect("valid config");
        assert_eq!(config.node_size, NodeSizeStrategy::ByRole);
        assert_eq!(config.edge_size, EdgeSizeStrategy::Default);
        assert!(config.labels.show_node_labels);
        assert!(config.node_border.is_none());
    }
}
