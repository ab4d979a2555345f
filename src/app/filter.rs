use std::collections::BTreeSet;

use crate::topology::{TopologyGraph, VisibleSubset};

struct Focus {
    entity: String,
    restore: BTreeSet<String>,
}

/// Active groups, alarms-only, search and neighbour focus, composed into one
/// visible subset. Every transition that narrows the groups keeps a single
/// snapshot so it can be undone exactly.
pub struct FilterState {
    known_groups: BTreeSet<String>,
    active_groups: BTreeSet<String>,
    alarms_only: bool,
    search: String,
    matches: Option<BTreeSet<String>>,
    pre_search: Option<BTreeSet<String>>,
    focus: Option<Focus>,
}

impl FilterState {
    pub fn new(graph: &TopologyGraph) -> Self {
        // Roster groups without members can never make anything visible.
        let known_groups: BTreeSet<String> = graph
            .group_keys()
            .into_iter()
            .filter(|key| graph.group_size(key) > 0)
            .collect();
        Self {
            active_groups: known_groups.clone(),
            known_groups,
            alarms_only: false,
            search: String::new(),
            matches: None,
            pre_search: None,
            focus: None,
        }
    }

    pub fn active_groups(&self) -> &BTreeSet<String> {
        &self.active_groups
    }

    pub fn is_group_active(&self, key: &str) -> bool {
        self.active_groups.contains(key)
    }

    pub fn alarms_only(&self) -> bool {
        self.alarms_only
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// `None` while the query is blank.
    pub fn matches(&self) -> Option<&BTreeSet<String>> {
        self.matches.as_ref()
    }

    pub fn is_focused(&self) -> bool {
        self.focus.is_some()
    }

    pub fn focus_entity(&self) -> Option<&str> {
        self.focus.as_ref().map(|focus| focus.entity.as_str())
    }

    /// Returns whether the set changed. Removing the last active group and
    /// unknown keys are rejected.
    pub fn toggle_group(&mut self, key: &str) -> bool {
        if !self.known_groups.contains(key) {
            tracing::trace!(key, "ignoring toggle of unknown group");
            return false;
        }

        if self.active_groups.contains(key) {
            if self.active_groups.len() == 1 {
                tracing::trace!(key, "refusing to deactivate the last active group");
                return false;
            }
            self.active_groups.remove(key);
        } else {
            self.active_groups.insert(key.to_owned());
        }
        true
    }

    pub fn set_alarms_only(&mut self, alarms_only: bool) {
        self.alarms_only = alarms_only;
    }

    pub fn set_search(&mut self, graph: &TopologyGraph, query: &str) {
        self.search = query.to_owned();
        self.matches = graph.search(query);

        if let Some(focus) = self.focus.as_mut() {
            // Focus owns the groups; an inactive search hands its snapshot over.
            if self.matches.as_ref().is_none_or(BTreeSet::is_empty) {
                if let Some(snapshot) = self.pre_search.take() {
                    focus.restore = snapshot;
                }
            }
            return;
        }

        match self.matches.as_ref().filter(|matches| !matches.is_empty()) {
            Some(matches) => {
                if self.pre_search.is_none() {
                    self.pre_search = Some(self.active_groups.clone());
                }
                let reached = graph.groups_reached_by(matches);
                tracing::debug!(matches = matches.len(), groups = reached.len(), "search narrowed groups");
                self.active_groups = reached;
            }
            None => {
                if let Some(snapshot) = self.pre_search.take() {
                    tracing::debug!("search cleared, restoring groups");
                    self.active_groups = snapshot;
                }
            }
        }
    }

    /// Shows only the selected entity's group and its neighbours' groups.
    pub fn focus_neighbors(&mut self, graph: &TopologyGraph, selected: Option<&str>) {
        let Some(id) = selected else {
            tracing::trace!("focus requested without a selection");
            return;
        };
        if graph.entity(id).is_none() {
            tracing::trace!(id, "focus requested for unknown entity");
            return;
        }

        let restore = match self.focus.take() {
            Some(focus) => focus.restore,
            None => self.active_groups.clone(),
        };
        self.active_groups = graph.neighbor_groups(id);
        self.focus = Some(Focus {
            entity: id.to_owned(),
            restore,
        });
        tracing::debug!(id, groups = self.active_groups.len(), "entered neighbour focus");
    }

    pub fn on_selection_changed(&mut self, graph: &TopologyGraph, selected: Option<&str>) {
        if self.focus.is_none() {
            return;
        }
        match selected {
            Some(id) => self.focus_neighbors(graph, Some(id)),
            None => self.reset_focus(),
        }
    }

    pub fn reset_focus(&mut self) {
        let Some(focus) = self.focus.take() else {
            tracing::trace!("reset requested while not focused");
            return;
        };
        self.active_groups = focus.restore;
        tracing::debug!(groups = self.active_groups.len(), "left neighbour focus");
    }

    pub fn visible(&self, graph: &TopologyGraph) -> VisibleSubset {
        let entities: Vec<usize> = graph
            .entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| {
                self.active_groups.contains(&entity.group)
                    && (!self.alarms_only || entity.has_active_alarm)
            })
            .map(|(index, _)| index)
            .collect();

        let shown: BTreeSet<&str> = entities
            .iter()
            .map(|&index| graph.entities[index].id.as_str())
            .collect();
        let relations = graph
            .relations
            .iter()
            .enumerate()
            .filter(|(_, relation)| {
                shown.contains(relation.source.as_str()) && shown.contains(relation.target.as_str())
            })
            .map(|(index, _)| index)
            .collect();

        VisibleSubset { entities, relations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Entity, GraphMetadata, GroupInfo, Relation, scenario_graph};

    fn groups(filter: &FilterState) -> Vec<&str> {
        filter.active_groups().iter().map(String::as_str).collect()
    }

    fn visible_ids(filter: &FilterState, graph: &TopologyGraph) -> Vec<String> {
        filter
            .visible(graph)
            .entities
            .into_iter()
            .map(|index| graph.entities[index].id.clone())
            .collect()
    }

    #[test]
    fn starts_with_every_group_active() {
        let graph = scenario_graph();
        let filter = FilterState::new(&graph);
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
        assert_eq!(filter.matches(), None);
        assert!(!filter.is_focused());
    }

    #[test]
    fn last_group_cannot_be_toggled_off() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);

        assert!(filter.toggle_group("g1"));
        assert!(!filter.toggle_group("g2"));
        assert_eq!(groups(&filter), vec!["g2"]);
        assert!(!filter.toggle_group("missing"));
        assert!(filter.toggle_group("g1"));
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
    }

    #[test]
    fn alarms_only_is_anded_with_groups() {
        let mut alarmed = Entity::new("A", "g1");
        alarmed.has_active_alarm = true;
        let mut other = Entity::new("C", "g2");
        other.has_active_alarm = true;
        let graph = TopologyGraph::new(
            vec![alarmed, Entity::new("B", "g1"), other],
            vec![Relation::new("A", "B"), Relation::new("A", "C")],
            GraphMetadata::default(),
        );
        let mut filter = FilterState::new(&graph);

        filter.set_alarms_only(true);
        assert_eq!(visible_ids(&filter, &graph), vec!["A", "C"]);
        assert_eq!(filter.visible(&graph).relations, vec![1]);

        filter.toggle_group("g2");
        assert_eq!(visible_ids(&filter, &graph), vec!["A"]);
        assert!(filter.visible(&graph).relations.is_empty());
    }

    #[test]
    fn relations_need_both_endpoints_visible() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        assert_eq!(filter.visible(&graph).relations, vec![0]);

        filter.toggle_group("g2");
        let subset = filter.visible(&graph);
        assert_eq!(subset.entities, vec![0, 1]);
        assert!(subset.relations.is_empty());
    }

    #[test]
    fn focus_then_reset_restores_groups() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.toggle_group("g2");
        filter.toggle_group("g2");

        filter.focus_neighbors(&graph, Some("B"));
        assert_eq!(groups(&filter), vec!["g1"]);
        assert_eq!(filter.focus_entity(), Some("B"));

        filter.reset_focus();
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
        assert!(!filter.is_focused());
    }

    #[test]
    fn focus_is_idempotent() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.toggle_group("g2");

        filter.focus_neighbors(&graph, Some("A"));
        let first = filter.active_groups().clone();
        filter.focus_neighbors(&graph, Some("A"));
        assert_eq!(filter.active_groups(), &first);

        filter.reset_focus();
        assert_eq!(groups(&filter), vec!["g1"]);
    }

    #[test]
    fn focus_without_selection_is_a_no_op() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.focus_neighbors(&graph, None);
        filter.focus_neighbors(&graph, Some("ghost"));
        assert!(!filter.is_focused());
        filter.reset_focus();
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
    }

    #[test]
    fn selection_change_refocuses_with_first_snapshot() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.toggle_group("g1");

        filter.focus_neighbors(&graph, Some("A"));
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
        filter.on_selection_changed(&graph, Some("B"));
        assert_eq!(groups(&filter), vec!["g1"]);
        assert_eq!(filter.focus_entity(), Some("B"));

        filter.on_selection_changed(&graph, None);
        assert!(!filter.is_focused());
        assert_eq!(groups(&filter), vec!["g2"]);
    }

    #[test]
    fn selection_change_without_focus_keeps_groups() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.on_selection_changed(&graph, Some("B"));
        assert!(!filter.is_focused());
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
    }

    #[test]
    fn search_narrows_then_restores() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);

        filter.set_search(&graph, "b");
        assert_eq!(groups(&filter), vec!["g1"]);
        assert_eq!(filter.matches().map(BTreeSet::len), Some(1));

        filter.set_search(&graph, "");
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
        assert_eq!(filter.matches(), None);
    }

    #[test]
    fn search_reaches_groups_of_related_entities() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.toggle_group("g2");

        filter.set_search(&graph, "a");
        assert_eq!(groups(&filter), vec!["g1", "g2"]);

        filter.set_search(&graph, "no such entity");
        assert_eq!(filter.matches().map(BTreeSet::len), Some(0));
        assert_eq!(groups(&filter), vec!["g1"]);
    }

    #[test]
    fn search_snapshot_is_taken_once() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.toggle_group("g2");

        filter.set_search(&graph, "c");
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
        filter.set_search(&graph, "b");
        assert_eq!(groups(&filter), vec!["g1"]);
        filter.set_search(&graph, "   ");
        assert_eq!(groups(&filter), vec!["g1"]);
    }

    #[test]
    fn focus_wins_over_search() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);

        filter.focus_neighbors(&graph, Some("B"));
        filter.set_search(&graph, "c");
        assert_eq!(groups(&filter), vec!["g1"]);
        assert_eq!(filter.matches().map(BTreeSet::len), Some(1));

        filter.reset_focus();
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
    }

    #[test]
    fn clearing_search_while_focused_returns_to_pre_search_groups() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.toggle_group("g2");

        filter.set_search(&graph, "c");
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
        filter.focus_neighbors(&graph, Some("C"));
        filter.set_search(&graph, "");
        assert!(filter.is_focused());

        filter.reset_focus();
        assert_eq!(groups(&filter), vec!["g1"]);
    }

    #[test]
    fn unmatched_search_while_focused_returns_to_pre_search_groups() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.toggle_group("g2");

        filter.set_search(&graph, "c");
        filter.focus_neighbors(&graph, Some("C"));
        filter.set_search(&graph, "zzz");
        assert_eq!(filter.matches().map(BTreeSet::len), Some(0));
        assert!(filter.pre_search.is_none());

        filter.reset_focus();
        assert_eq!(groups(&filter), vec!["g1"]);
    }

    #[test]
    fn memberless_roster_groups_are_not_toggleable() {
        let metadata = GraphMetadata {
            groups: vec![GroupInfo {
                key: "empty".into(),
                ..GroupInfo::default()
            }],
            ..GraphMetadata::default()
        };
        let graph = TopologyGraph::new(
            vec![Entity::new("A", "g1"), Entity::new("B", "g2")],
            Vec::new(),
            metadata,
        );
        let mut filter = FilterState::new(&graph);
        assert_eq!(groups(&filter), vec!["g1", "g2"]);

        assert!(!filter.toggle_group("empty"));
        assert!(filter.toggle_group("g1"));
        assert!(!filter.toggle_group("g2"));
        assert_eq!(visible_ids(&filter, &graph), vec!["B"]);
    }

    fn mixed_graph() -> TopologyGraph {
        let metadata = GraphMetadata {
            groups: vec![GroupInfo {
                key: "spare".into(),
                ..GroupInfo::default()
            }],
            ..GraphMetadata::default()
        };
        let mut entities = Vec::new();
        for (index, group) in ["g1", "g1", "g2", "g2", "g3", "g4", "g4", "g1"]
            .into_iter()
            .enumerate()
        {
            let mut entity = Entity::new(format!("n{index}"), group);
            entity.label = format!("node {}", (b'a' + index as u8) as char);
            entity.has_active_alarm = index % 3 == 0;
            entities.push(entity);
        }
        let relations = [(0, 1), (0, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 7), (1, 5)]
            .into_iter()
            .map(|(source, target)| Relation::new(format!("n{source}"), format!("n{target}")))
            .collect();
        TopologyGraph::new(entities, relations, metadata)
    }

    #[test]
    fn invariants_hold_across_operation_sequences() {
        let graph = mixed_graph();
        let toggles = ["g1", "g2", "g3", "g4", "spare", "missing"];
        let queries = ["node a", "node c", "node", "zzz", "", "  ", "n6"];

        for seed in 0..200u64 {
            let mut filter = FilterState::new(&graph);
            let mut selected: Option<String> = None;
            let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
            let mut next = |bound: usize| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((state >> 33) as usize) % bound
            };

            for step in 0..40 {
                match next(6) {
                    0 => {
                        filter.toggle_group(toggles[next(toggles.len())]);
                    }
                    1 => filter.set_alarms_only(!filter.alarms_only()),
                    2 => filter.set_search(&graph, queries[next(queries.len())]),
                    3 => filter.focus_neighbors(&graph, selected.as_deref()),
                    4 => filter.reset_focus(),
                    _ => {
                        let pick = next(graph.entity_count() + 1);
                        selected = graph.entities.get(pick).map(|entity| entity.id.clone());
                        filter.on_selection_changed(&graph, selected.as_deref());
                    }
                }

                let context = format!("seed {seed} step {step}");
                assert!(!filter.active_groups().is_empty(), "{context}");
                assert!(
                    filter
                        .active_groups()
                        .iter()
                        .all(|key| graph.group_size(key) > 0),
                    "{context}"
                );

                let subset = filter.visible(&graph);
                let shown: BTreeSet<&str> = subset
                    .entities
                    .iter()
                    .map(|&index| graph.entities[index].id.as_str())
                    .collect();
                for &index in &subset.relations {
                    let relation = &graph.relations[index];
                    assert!(shown.contains(relation.source.as_str()), "{context}");
                    assert!(shown.contains(relation.target.as_str()), "{context}");
                }
                if !filter.alarms_only() {
                    assert!(!shown.is_empty(), "{context}");
                }
                if filter.matches().is_none_or(BTreeSet::is_empty) {
                    assert!(filter.pre_search.is_none(), "{context}");
                }
            }
        }
    }

    #[test]
    fn toggle_scenario_keeps_last_group() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        assert_eq!(visible_ids(&filter, &graph), vec!["A", "B", "C"]);

        assert!(filter.toggle_group("g1"));
        assert_eq!(visible_ids(&filter, &graph), vec!["C"]);

        assert!(!filter.toggle_group("g2"));
        assert_eq!(visible_ids(&filter, &graph), vec!["C"]);
    }

    #[test]
    fn focus_scenario_restores_prior_step() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.toggle_group("g1");

        filter.focus_neighbors(&graph, Some("A"));
        assert_eq!(groups(&filter), vec!["g1", "g2"]);
        assert_eq!(visible_ids(&filter, &graph), vec!["A", "B", "C"]);

        filter.reset_focus();
        assert_eq!(groups(&filter), vec!["g2"]);
        assert_eq!(visible_ids(&filter, &graph), vec!["C"]);
    }

    #[test]
    fn search_then_clear_restores_visible_set() {
        let graph = scenario_graph();
        let mut filter = FilterState::new(&graph);
        filter.toggle_group("g1");

        filter.set_search(&graph, "B");
        assert_eq!(visible_ids(&filter, &graph), vec!["A", "B"]);

        filter.set_search(&graph, "");
        assert_eq!(visible_ids(&filter, &graph), vec!["C"]);
    }
}
