use eframe::egui::{self, Align, Layout, RichText, Sense, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::encoding::{LayoutKind, LayoutMode};
use crate::topology::TopologyGraph;

use super::super::ViewModel;

const SUGGESTION_ROWS: usize = 12;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Entity indices ranked by the best fuzzy score over label and id.
fn rank_entities(graph: &TopologyGraph, query: &str, limit: usize) -> Vec<usize> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, usize)> = graph
        .entities
        .iter()
        .enumerate()
        .filter_map(|(index, entity)| {
            let label = fuzzy_match_score(&matcher, &entity.label, query);
            let id = fuzzy_match_score(&matcher, &entity.id, query);
            label.max(id).map(|score| (score, index))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.truncate(limit);
    scored.into_iter().map(|(_, index)| index).collect()
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Filters");
        ui.separator();
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.draw_search(ui);
                ui.separator();
                self.draw_group_toggles(ui);
                ui.separator();
                self.draw_focus_controls(ui);
                ui.separator();
                self.draw_layout_controls(ui);
                ui.separator();
                self.draw_legend(ui);
            });
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search (name or id)")
            .on_hover_text("Matching entities are highlighted and their groups shown.");
        let mut query = self.search.clone();
        let response = ui.text_edit_singleline(&mut query);
        if response.changed() {
            self.set_search(query);
        }

        match self.filter.matches() {
            Some(matches) if !matches.is_empty() => {
                ui.small(format!("{} matching entities", matches.len()));
            }
            Some(_) => {
                ui.small("No matches");
            }
            None => {}
        }

        let ranked = rank_entities(&self.graph, &self.search, SUGGESTION_ROWS);
        let mut picked = None;
        for index in ranked {
            let Some(entity) = self.graph.entities.get(index) else {
                continue;
            };
            let is_selected = self.selection.selected() == Some(entity.id.as_str());
            let row = ui
                .horizontal(|ui| {
                    let clicked = ui.selectable_label(is_selected, &entity.label).clicked();
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.small(self.group_label(&entity.group));
                    });
                    clicked
                })
                .inner;
            if row {
                picked = Some(entity.id.clone());
            }
        }
        if let Some(id) = picked {
            self.select_entity(Some(id));
        }
    }

    fn draw_group_toggles(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Groups").strong());
        let mut toggled = None;
        for key in self.graph.group_keys() {
            let mut active = self.filter.is_group_active(&key);
            let color = self.palette.color_for(&key);
            ui.horizontal(|ui| {
                let (swatch, _) = ui.allocate_exact_size(vec2(12.0, 12.0), Sense::hover());
                ui.painter().circle_filled(swatch.center(), 5.0, color);
                let members = self.graph.group_size(&key);
                let label = format!("{} ({members})", self.group_label(&key));
                if ui
                    .add_enabled(members > 0, egui::Checkbox::new(&mut active, label))
                    .changed()
                {
                    toggled = Some(key.clone());
                }
            });
        }
        if let Some(key) = toggled {
            if !self.filter.toggle_group(&key) {
                tracing::debug!(group = %key, "group toggle rejected");
            }
        }

        ui.add_space(4.0);
        let mut alarms_only = self.filter.alarms_only();
        if ui
            .checkbox(&mut alarms_only, "Only entities with alarms")
            .changed()
        {
            self.filter.set_alarms_only(alarms_only);
        }
    }

    fn draw_focus_controls(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Neighbour focus").strong());
        let focused = self.filter.is_focused();
        let selected = self.selection.selected().map(str::to_owned);
        ui.horizontal(|ui| {
            let focus = ui
                .add_enabled(
                    selected.is_some() && !focused,
                    egui::Button::new("Focus neighbours"),
                )
                .on_hover_text("Show only the groups the selected entity connects to.");
            if focus.clicked() {
                self.filter.focus_neighbors(&self.graph, selected.as_deref());
            }
            if ui
                .add_enabled(focused, egui::Button::new("Reset focus"))
                .clicked()
            {
                self.filter.reset_focus();
            }
        });
        if let Some(id) = self.filter.focus_entity() {
            ui.small(format!("Focused on {id}"));
        }
    }

    fn draw_layout_controls(&mut self, ui: &mut Ui) {
        egui::CollapsingHeader::new("Layout")
            .default_open(false)
            .show(ui, |ui| {
                let mut changed = false;
                ui.horizontal_wrapped(|ui| {
                    for (kind, label) in [
                        (LayoutKind::Force, "Force"),
                        (LayoutKind::Circular, "Circular"),
                        (LayoutKind::Random, "Random"),
                    ] {
                        changed |= ui
                            .selectable_value(&mut self.config.layout.kind, kind, label)
                            .changed();
                    }
                });
                ui.add_enabled_ui(self.config.layout.kind == LayoutKind::Force, |ui| {
                    ui.horizontal(|ui| {
                        changed |= ui
                            .selectable_value(
                                &mut self.config.layout.mode,
                                LayoutMode::Continuous,
                                "Continuous",
                            )
                            .on_hover_text("Animate the simulation frame by frame.")
                            .changed();
                        changed |= ui
                            .selectable_value(&mut self.config.layout.mode, LayoutMode::Batch, "Batch")
                            .on_hover_text("Settle the layout before the first frame.")
                            .changed();
                    });
                    changed |= ui
                        .checkbox(&mut self.config.layout.seed_by_group, "Seed by group")
                        .changed();
                    changed |= ui
                        .add(
                            egui::Slider::new(&mut self.config.layout.force.link_distance, 20.0..=400.0)
                                .text("Link distance"),
                        )
                        .changed();
                    changed |= ui
                        .add(
                            egui::Slider::new(&mut self.config.layout.force.charge, -1500.0..=-10.0)
                                .text("Charge"),
                        )
                        .changed();
                });

                ui.checkbox(&mut self.config.labels.show_node_labels, "Node labels");
                ui.checkbox(&mut self.config.labels.show_edge_labels, "Relation labels");

                if ui.button("Re-run layout").clicked() {
                    changed = true;
                }
                if changed {
                    self.request_relayout();
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::scenario_graph;

    #[test]
    fn ranks_best_match_first() {
        let mut graph = scenario_graph();
        graph.entities[0].label = "Hub North".into();
        graph.entities[1].label = "Edge South".into();
        graph.entities[2].label = "Hub South".into();

        let ranked = rank_entities(&graph, "south", 5);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.contains(&1) && ranked.contains(&2));
        assert!(rank_entities(&graph, "  ", 5).is_empty());
        assert_eq!(rank_entities(&graph, "hub", 1).len(), 1);
    }
}
