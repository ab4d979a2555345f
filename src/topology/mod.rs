mod adapter;
mod canonical;
mod gnb;
mod load;
mod model;

pub use adapter::DEFAULT_ADAPTER;
pub use load::{LoadedDataset, load_dataset};
pub use model::{Entity, Relation, RelationKey, Role, TopologyGraph, VisibleSubset};

#[cfg(test)]
pub(crate) use model::tests::scenario_graph;
#[cfg(test)]
pub(crate) use model::{GraphMetadata, GroupInfo};
