use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::encoding::{
    EdgeColorStrategy, EdgeSizeStrategy, ForceParams, LabelConfig, LayoutConfig, LayoutKind,
    LayoutMode, NodeBorderConfig, NodeColorStrategy, NodeSizeStrategy, VisualConfig,
};

use super::adapter::GraphAdapter;
use super::model::{
    Alarm, AlarmContext, Entity, GraphMetadata, GroupInfo, METRIC_ALARMS, METRIC_CONNECTIONS,
    Relation, Role, TopologyGraph, Transport,
};

const SEVERITY_ORDER: [&str; 3] = ["Critical", "Major", "Minor"];

#[derive(Debug, Deserialize)]
struct RawTopology {
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    nodes_with_alarms: Option<u64>,
    /// Kept as a JSON object so the roster order survives.
    #[serde(default)]
    subnet_groups: Map<String, Value>,
    #[serde(default)]
    alarm_context: Option<RawAlarmContext>,
}

#[derive(Debug, Deserialize)]
struct RawAlarmContext {
    #[serde(default)]
    window_start: String,
    #[serde(default)]
    window_end: String,
    #[serde(default)]
    total_alarms: u64,
    #[serde(default)]
    severity_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    probable_causes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawAlarm {
    #[serde(default)]
    alarm_id: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    alarm_code: String,
    #[serde(default)]
    probable_cause: String,
    #[serde(default)]
    alarm_time: String,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    gnb_id: String,
    #[serde(default)]
    ne_name: Option<String>,
    #[serde(default)]
    role: String,
    #[serde(default)]
    ip_subnet_48: String,
    #[serde(default)]
    n_cells: u32,
    #[serde(default)]
    has_active_alarms: bool,
    #[serde(default)]
    alarms: Vec<RawAlarm>,
    #[serde(default)]
    size: Option<f32>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTransport {
    #[serde(default)]
    remote_ip_address: String,
    #[serde(default)]
    ip_subnet_48: String,
    #[serde(default)]
    xn_created_by: String,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    source: String,
    target: String,
    #[serde(default)]
    has_radio_config: bool,
    #[serde(default)]
    has_transport_config: bool,
    #[serde(default)]
    transport: Option<RawTransport>,
    #[serde(default)]
    weight: f32,
    #[serde(default)]
    thickness: Option<f32>,
    #[serde(default)]
    cell_relations: Vec<Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// Radio-access topology exports: gNodeB entities grouped by /48 subnet.
pub struct GnbTopologyAdapter;

impl GnbTopologyAdapter {
    fn top_severity(node: &RawNode) -> String {
        if !node.has_active_alarms || node.alarms.is_empty() {
            return "None".to_owned();
        }
        SEVERITY_ORDER
            .iter()
            .find(|severity| node.alarms.iter().any(|alarm| alarm.severity == **severity))
            .map(|severity| (*severity).to_owned())
            .unwrap_or_else(|| "None".to_owned())
    }

    fn groups(subnet_groups: &Map<String, Value>) -> Vec<GroupInfo> {
        subnet_groups
            .iter()
            .map(|(key, members)| GroupInfo {
                key: key.clone(),
                label: key.rsplit(':').next().unwrap_or(key).to_owned(),
                color: None,
                members: members
                    .as_array()
                    .map(|ids| {
                        ids.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_owned)
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect()
    }

    fn alarms(alarms: Vec<RawAlarm>) -> Vec<Alarm> {
        alarms
            .into_iter()
            .map(|alarm| Alarm {
                id: alarm.alarm_id,
                severity: alarm.severity,
                cause: alarm.probable_cause,
                code: alarm.alarm_code,
                time: alarm.alarm_time,
            })
            .collect()
    }

    fn entity(node: RawNode) -> Entity {
        let status = Self::top_severity(&node);
        let mut metrics = BTreeMap::new();
        metrics.insert(METRIC_CONNECTIONS.to_owned(), node.n_cells as f64);
        metrics.insert(METRIC_ALARMS.to_owned(), node.alarms.len() as f64);

        let role = if node.role == "source" {
            Role::Primary
        } else {
            Role::Secondary
        };
        let label = node
            .ne_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("GNB-{}", node.gnb_id));

        Entity {
            label,
            group: node.ip_subnet_48,
            role,
            entity_type: Some(node.role).filter(|role| !role.is_empty()),
            status: Some(status),
            metrics,
            has_active_alarm: node.has_active_alarms,
            alarms: Self::alarms(node.alarms),
            size_override: node.size,
            payload: Value::Object(node.rest),
            id: node.gnb_id,
        }
    }

    fn relation(edge: RawEdge, primary_group: &str) -> Relation {
        let transport = edge.transport.unwrap_or_default();
        let kind = if edge.weight == 0.0 {
            "transport-only"
        } else if transport.ip_subnet_48 != primary_group {
            "cross-subnet"
        } else {
            "normal"
        };
        let mut metrics = BTreeMap::new();
        metrics.insert("cell-relations".to_owned(), edge.cell_relations.len() as f64);

        Relation {
            source: edge.source,
            target: edge.target,
            weight: edge.weight,
            thickness_override: edge.thickness,
            has_radio_config: edge.has_radio_config,
            has_transport_config: edge.has_transport_config,
            transport: Transport {
                remote_address: transport.remote_ip_address,
                group: transport.ip_subnet_48,
                created_by: transport.xn_created_by,
            },
            kind: Some(kind.to_owned()),
            label: (edge.weight > 0.0).then(|| format!("{} rels", edge.weight)),
            metrics,
            payload: Value::Object(edge.rest),
        }
    }
}

impl GraphAdapter for GnbTopologyAdapter {
    fn transform(&self, raw: Value) -> Result<TopologyGraph> {
        let raw: RawTopology =
            serde_json::from_value(raw).context("invalid gNodeB topology document")?;

        let primary_group = raw
            .nodes
            .iter()
            .find(|node| node.role == "source")
            .map(|node| node.ip_subnet_48.clone())
            .unwrap_or_default();
        let title = raw
            .nodes
            .iter()
            .find(|node| node.role == "source")
            .map(|node| {
                format!(
                    "Topology: {}",
                    node.ne_name.as_deref().unwrap_or("Unknown")
                )
            });

        let metadata = GraphMetadata {
            title,
            groups: Self::groups(&raw.metadata.subnet_groups),
            alarm_context: raw.metadata.alarm_context.map(|context| AlarmContext {
                window_start: context.window_start,
                window_end: context.window_end,
                total_alarms: context.total_alarms,
                severity_distribution: context.severity_distribution,
                probable_causes: context.probable_causes,
            }),
            nodes_with_alarms: raw.metadata.nodes_with_alarms,
            summary: Value::Null,
        };

        let entities = raw.nodes.into_iter().map(Self::entity).collect();
        let relations = raw
            .edges
            .into_iter()
            .map(|edge| Self::relation(edge, &primary_group))
            .collect();

        Ok(TopologyGraph::new(entities, relations, metadata))
    }

    fn default_config(&self) -> VisualConfig {
        VisualConfig {
            layout: LayoutConfig {
                kind: LayoutKind::Force,
                mode: LayoutMode::Continuous,
                seed_by_group: true,
                force: ForceParams::default(),
            },
            node_color: NodeColorStrategy::ByGroup {
                palette: BTreeMap::new(),
                default_color: Some("#64748B".to_owned()),
            },
            node_size: NodeSizeStrategy::ByRole,
            node_border: Some(NodeBorderConfig {
                status_colors: [
                    ("Critical", "#EF4444"),
                    ("Major", "#F97316"),
                    ("Minor", "#EAB308"),
                    ("None", "transparent"),
                ]
                .into_iter()
                .map(|(status, color)| (status.to_owned(), color.to_owned()))
                .collect(),
                default_color: "transparent".to_owned(),
                ratio: 0.15,
            }),
            edge_color: EdgeColorStrategy::ByGroup,
            edge_size: EdgeSizeStrategy::Default,
            labels: LabelConfig {
                show_node_labels: true,
                show_edge_labels: false,
                force_label_types: vec!["source".to_owned()],
            },
        }
    }
}
