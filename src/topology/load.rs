use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::encoding::VisualConfig;

use super::adapter::AdapterRegistry;
use super::model::TopologyGraph;

/// A loaded dataset together with the visual configuration to render it with.
pub struct LoadedDataset {
    pub graph: TopologyGraph,
    pub config: VisualConfig,
}

pub fn load_dataset(
    data_path: &Path,
    adapter_key: &str,
    config_path: Option<&Path>,
) -> Result<LoadedDataset> {
    let registry = AdapterRegistry::with_builtin();
    let adapter = registry.get(adapter_key)?;

    let raw = fs::read_to_string(data_path)
        .with_context(|| format!("failed to read dataset {}", data_path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("dataset {} is not valid JSON", data_path.display()))?;
    let graph = adapter
        .transform(value)
        .with_context(|| format!("failed to transform dataset with adapter {adapter_key}"))?;

    let config = match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read visual config {}", path.display()))?;
            VisualConfig::from_json(&raw)
                .with_context(|| format!("invalid visual config {}", path.display()))?
        }
        None => adapter.default_config(),
    };

    tracing::info!(
        adapter = adapter_key,
        entities = graph.entity_count(),
        relations = graph.relation_count(),
        groups = graph.group_keys().len(),
        "dataset loaded"
    );

    Ok(LoadedDataset { graph, config })
}
