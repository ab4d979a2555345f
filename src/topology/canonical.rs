use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::encoding::VisualConfig;

use super::adapter::GraphAdapter;
use super::model::{Entity, GraphMetadata, GroupInfo, Relation, Role, TopologyGraph};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalGraph {
    #[serde(default)]
    nodes: Vec<CanonicalNode>,
    #[serde(default)]
    edges: Vec<CanonicalEdge>,
    #[serde(default)]
    metadata: CanonicalMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    groups: Map<String, Value>,
    #[serde(default)]
    summary: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalNode {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    metrics: BTreeMap<String, f64>,
    #[serde(default)]
    domain_data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalEdge {
    source: String,
    target: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    weight: Option<f32>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    metrics: BTreeMap<String, f64>,
    #[serde(default)]
    domain_data: Value,
}

/// Domain-agnostic `{nodes, edges, metadata}` documents.
pub struct CanonicalAdapter;

impl GraphAdapter for CanonicalAdapter {
    fn transform(&self, raw: Value) -> Result<TopologyGraph> {
        let raw: CanonicalGraph =
            serde_json::from_value(raw).context("invalid canonical graph document")?;

        let groups = raw
            .metadata
            .groups
            .iter()
            .map(|(key, info)| GroupInfo {
                key: key.clone(),
                label: info
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or(key)
                    .to_owned(),
                color: info.get("color").and_then(Value::as_str).map(str::to_owned),
                members: Vec::new(),
            })
            .collect();

        let entities = raw
            .nodes
            .into_iter()
            .map(|node| {
                let role = match node.kind.as_deref() {
                    Some("source" | "primary") => Role::Primary,
                    _ => Role::Secondary,
                };
                let alarmed = node
                    .status
                    .as_deref()
                    .is_some_and(|status| !status.is_empty() && status != "None");
                Entity {
                    label: node.label.unwrap_or_else(|| node.id.clone()),
                    group: node.group.unwrap_or_default(),
                    role,
                    entity_type: node.kind,
                    status: node.status,
                    metrics: node.metrics,
                    has_active_alarm: alarmed,
                    alarms: Vec::new(),
                    size_override: None,
                    payload: node.domain_data,
                    id: node.id,
                }
            })
            .collect();

        let relations = raw
            .edges
            .into_iter()
            .map(|edge| {
                let mut relation = Relation::new(edge.source, edge.target);
                relation.weight = edge.weight.unwrap_or(0.0);
                relation.kind = edge.kind;
                relation.label = edge.label;
                relation.metrics = edge.metrics;
                relation.payload = edge.domain_data;
                relation
            })
            .collect();

        let metadata = GraphMetadata {
            title: raw.metadata.title,
            groups,
            alarm_context: None,
            nodes_with_alarms: None,
            summary: raw.metadata.summary,
        };

        Ok(TopologyGraph::new(entities, relations, metadata))
    }

    fn default_config(&self) -> VisualConfig {
        VisualConfig::default()
    }
}
