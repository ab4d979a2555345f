use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::Value;
use thiserror::Error;

use crate::encoding::VisualConfig;

use super::canonical::CanonicalAdapter;
use super::gnb::GnbTopologyAdapter;
use super::model::TopologyGraph;

pub const DEFAULT_ADAPTER: &str = "gnb-topology";

/// Turns one dataset flavour into the normalized graph plus the visual
/// configuration that suits it.
pub trait GraphAdapter {
    fn transform(&self, raw: Value) -> Result<TopologyGraph>;
    fn default_config(&self) -> VisualConfig;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("adapter \"{key}\" not registered; available: {}", available.join(", "))]
    NotRegistered { key: String, available: Vec<String> },
}

type AdapterFactory = fn() -> Box<dyn GraphAdapter>;

#[derive(Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        registry.register(DEFAULT_ADAPTER, || Box::new(GnbTopologyAdapter));
        registry.register("canonical", || Box::new(CanonicalAdapter));
        registry
    }

    pub fn register(&mut self, key: impl Into<String>, factory: AdapterFactory) {
        self.factories.insert(key.into(), factory);
    }

    pub fn keys(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Result<Box<dyn GraphAdapter>, AdapterError> {
        match self.factories.get(key) {
            Some(factory) => Ok(factory()),
            None => {
                tracing::warn!(key, "requested unregistered adapter");
                Err(AdapterError::NotRegistered {
                    key: key.to_owned(),
                    available: self.keys(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_adapter_names_key_and_available() {
        let registry = AdapterRegistry::with_builtin();
        let error = registry.get("ledger").err().expect("lookup should fail");

        assert_eq!(
            error,
            AdapterError::NotRegistered {
                key: "ledger".into(),
                available: vec!["canonical".into(), "gnb-topology".into()],
            }
        );
        let message = error.to_string();
        assert!(message.contains("\"ledger\""));
        assert!(message.contains("canonical, gnb-topology"));
    }

    #[test]
    fn builtin_adapters_resolve() {
        let registry = AdapterRegistry::with_builtin();
        assert!(registry.get(DEFAULT_ADAPTER).is_ok());
        assert!(registry.get("canonical").is_ok());
    }
}
