use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;

pub const METRIC_CONNECTIONS: &str = "connections";
pub const METRIC_ALARMS: &str = "alarms";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Primary,
    Secondary,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Alarm {
    pub id: String,
    pub severity: String,
    pub cause: String,
    pub code: String,
    pub time: String,
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: String,
    pub label: String,
    pub group: String,
    pub role: Role,
    pub entity_type: Option<String>,
    pub status: Option<String>,
    pub metrics: BTreeMap<String, f64>,
    pub has_active_alarm: bool,
    pub alarms: Vec<Alarm>,
    pub size_override: Option<f32>,
    pub payload: Value,
}

impl Entity {
    pub fn new(id: impl Into<String>, group: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            group: group.into(),
            role: Role::Secondary,
            entity_type: None,
            status: None,
            metrics: BTreeMap::new(),
            has_active_alarm: false,
            alarms: Vec::new(),
            size_override: None,
            payload: Value::Null,
        }
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    /// Size override, ignoring non-positive values.
    pub fn explicit_size(&self) -> Option<f32> {
        self.size_override.filter(|size| *size > 0.0)
    }

    /// Severity shown by the alarm ring: the derived status, else the first
    /// alarm in document order.
    pub fn alarm_severity(&self) -> Option<&str> {
        self.status
            .as_deref()
            .filter(|status| !status.is_empty() && *status != "None")
            .or_else(|| self.alarms.first().map(|alarm| alarm.severity.as_str()))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Transport {
    pub remote_address: String,
    pub group: String,
    pub created_by: String,
}

#[derive(Clone, Debug)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub weight: f32,
    pub thickness_override: Option<f32>,
    pub has_radio_config: bool,
    pub has_transport_config: bool,
    pub transport: Transport,
    pub kind: Option<String>,
    pub label: Option<String>,
    pub metrics: BTreeMap<String, f64>,
    pub payload: Value,
}

impl Relation {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: 0.0,
            thickness_override: None,
            has_radio_config: true,
            has_transport_config: true,
            transport: Transport::default(),
            kind: None,
            label: None,
            metrics: BTreeMap::new(),
            payload: Value::Null,
        }
    }

    pub fn key(&self) -> RelationKey {
        RelationKey {
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }

    pub fn other_end(&self, id: &str) -> Option<&str> {
        if self.source == id {
            Some(self.target.as_str())
        } else if self.target == id {
            Some(self.source.as_str())
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationKey {
    pub source: String,
    pub target: String,
}

#[derive(Clone, Debug, Default)]
pub struct GroupInfo {
    pub key: String,
    pub label: String,
    pub color: Option<String>,
    pub members: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AlarmContext {
    pub window_start: String,
    pub window_end: String,
    pub total_alarms: u64,
    pub severity_distribution: BTreeMap<String, u64>,
    pub probable_causes: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GraphMetadata {
    pub title: Option<String>,
    pub groups: Vec<GroupInfo>,
    pub alarm_context: Option<AlarmContext>,
    pub nodes_with_alarms: Option<u64>,
    pub summary: Value,
}

#[derive(Clone, Debug)]
pub struct TopologyGraph {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub metadata: GraphMetadata,
    pub dropped_relations: usize,
    index_by_id: HashMap<String, usize>,
    index_by_pair: HashMap<(String, String), usize>,
}

/// Indices into [`TopologyGraph::entities`] and [`TopologyGraph::relations`]
/// that pass the active filters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibleSubset {
    pub entities: Vec<usize>,
    pub relations: Vec<usize>,
}

impl VisibleSubset {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl TopologyGraph {
    pub fn new(entities: Vec<Entity>, relations: Vec<Relation>, metadata: GraphMetadata) -> Self {
        let mut index_by_id = HashMap::with_capacity(entities.len());
        let mut kept_entities = Vec::with_capacity(entities.len());
        for entity in entities {
            if index_by_id.contains_key(&entity.id) {
                tracing::debug!(id = %entity.id, "duplicate entity id, keeping first");
                continue;
            }
            index_by_id.insert(entity.id.clone(), kept_entities.len());
            kept_entities.push(entity);
        }

        let mut index_by_pair = HashMap::with_capacity(relations.len());
        let mut kept_relations = Vec::with_capacity(relations.len());
        let mut dropped_relations = 0usize;
        for relation in relations {
            if !index_by_id.contains_key(&relation.source)
                || !index_by_id.contains_key(&relation.target)
            {
                tracing::debug!(
                    source = %relation.source,
                    target = %relation.target,
                    "dropping relation with unknown endpoint"
                );
                dropped_relations += 1;
                continue;
            }

            let pair = (relation.source.clone(), relation.target.clone());
            if index_by_pair.contains_key(&pair) {
                dropped_relations += 1;
                continue;
            }
            index_by_pair.insert(pair, kept_relations.len());
            kept_relations.push(relation);
        }

        if dropped_relations > 0 {
            tracing::warn!(dropped_relations, "some relations were dropped while loading");
        }

        Self {
            entities: kept_entities,
            relations: kept_relations,
            metadata,
            dropped_relations,
            index_by_id,
            index_by_pair,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.index_by_id
            .get(id)
            .and_then(|&index| self.entities.get(index))
    }

    pub fn relation(&self, source: &str, target: &str) -> Option<&Relation> {
        self.index_by_pair
            .get(&(source.to_owned(), target.to_owned()))
            .and_then(|&index| self.relations.get(index))
    }

    pub fn relation_by_key(&self, key: &RelationKey) -> Option<&Relation> {
        self.relation(&key.source, &key.target)
    }

    /// Group keys in roster order, followed by groups only seen on entities.
    pub fn group_keys(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut keys = Vec::new();
        let roster = self.metadata.groups.iter().map(|group| group.key.as_str());
        let observed = self.entities.iter().map(|entity| entity.group.as_str());
        for key in roster.chain(observed) {
            if seen.insert(key) {
                keys.push(key.to_owned());
            }
        }
        keys
    }

    pub fn group_info(&self, key: &str) -> Option<&GroupInfo> {
        self.metadata.groups.iter().find(|group| group.key == key)
    }

    pub fn group_size(&self, key: &str) -> usize {
        self.entities
            .iter()
            .filter(|entity| entity.group == key)
            .count()
    }

    /// Degree of every entity, counting only the given relations.
    pub fn degrees(&self, relations: &[usize]) -> HashMap<&str, usize> {
        let mut degrees = HashMap::new();
        for relation in relations.iter().filter_map(|&index| self.relations.get(index)) {
            *degrees.entry(relation.source.as_str()).or_insert(0) += 1;
            *degrees.entry(relation.target.as_str()).or_insert(0) += 1;
        }
        degrees
    }

    pub fn neighbors(&self, id: &str) -> Vec<&Entity> {
        self.relations
            .iter()
            .filter_map(|relation| relation.other_end(id))
            .filter_map(|other| self.entity(other))
            .collect()
    }

    /// The entity's own group plus the group of every directly related entity.
    pub fn neighbor_groups(&self, id: &str) -> BTreeSet<String> {
        let mut groups = BTreeSet::new();
        let Some(entity) = self.entity(id) else {
            return groups;
        };
        groups.insert(entity.group.clone());
        for neighbor in self.neighbors(id) {
            groups.insert(neighbor.group.clone());
        }
        groups
    }

    /// Case-insensitive substring match against label and id.
    /// Returns `None` for a blank query, meaning search is inactive.
    pub fn search(&self, query: &str) -> Option<BTreeSet<String>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }

        let needle = trimmed.to_lowercase();
        let matches = self
            .entities
            .iter()
            .filter(|entity| {
                entity.label.to_lowercase().contains(&needle)
                    || entity.id.to_lowercase().contains(&needle)
            })
            .map(|entity| entity.id.clone())
            .collect();
        Some(matches)
    }

    /// Groups of the matched entities and of every entity related to a match.
    pub fn groups_reached_by(&self, matches: &BTreeSet<String>) -> BTreeSet<String> {
        let mut groups = BTreeSet::new();
        for id in matches {
            if let Some(entity) = self.entity(id) {
                groups.insert(entity.group.clone());
            }
        }
        for relation in &self.relations {
            if matches.contains(&relation.source) || matches.contains(&relation.target) {
                for end in [&relation.source, &relation.target] {
                    if let Some(entity) = self.entity(end) {
                        groups.insert(entity.group.clone());
                    }
                }
            }
        }
        groups
    }
}
