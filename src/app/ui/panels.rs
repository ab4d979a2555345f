use eframe::egui::{self, Align, Color32, Layout, RichText, Sense, Stroke, Ui, vec2};

use crate::encoding::{SEARCH_HIGHLIGHT, severity_color};

use super::super::ViewModel;

const LEGEND_SEVERITIES: [&str; 3] = ["Critical", "Major", "Minor"];

fn swatch(ui: &mut Ui, fill: Color32, ring: Option<Color32>) {
    let (rect, _) = ui.allocate_exact_size(vec2(16.0, 16.0), Sense::hover());
    ui.painter().circle_filled(rect.center(), 5.0, fill);
    if let Some(ring) = ring {
        ui.painter()
            .circle_stroke(rect.center(), 7.0, Stroke::new(1.5, ring));
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_header(
        &mut self,
        ui: &mut Ui,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        ui.horizontal(|ui| {
            ui.heading(self.graph.metadata.title.as_deref().unwrap_or("netgraph-lens"));
            ui.separator();
            ui.label(format!(
                "entities: {}/{}",
                self.visible.entities.len(),
                self.graph.entity_count()
            ));
            ui.label(format!(
                "relations: {}/{}",
                self.visible.relations.len(),
                self.graph.relation_count()
            ));
            if self.graph.dropped_relations > 0 {
                ui.label(format!("dropped: {}", self.graph.dropped_relations))
                    .on_hover_text("Relations referencing unknown entities were skipped.");
            }
            if let Some(count) = self.graph.metadata.nodes_with_alarms {
                ui.label(format!("alarmed: {count}"));
            }
            if let Some(context) = &self.graph.metadata.alarm_context {
                let distribution = context
                    .severity_distribution
                    .iter()
                    .map(|(severity, count)| format!("{severity} {count}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                ui.label(format!("alarms: {}", context.total_alarms))
                    .on_hover_ui(|ui| {
                        ui.label(format!("{} to {}", context.window_start, context.window_end));
                        if !distribution.is_empty() {
                            ui.label(distribution.as_str());
                        }
                        for cause in &context.probable_causes {
                            ui.small(cause.as_str());
                        }
                    });
            }

            let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload"));
            if reload_button.clicked() {
                *reload_requested = true;
            }
            if ui.button("Fit view").clicked() {
                self.fit_pending = true;
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(format!(
                    "drawn {} / {}  zoom {:.2}",
                    self.drawn_nodes, self.drawn_edges, self.zoom
                ));
                if let Some(simulation) = self.layout.simulation().filter(|sim| sim.is_active()) {
                    ui.spinner()
                        .on_hover_text(format!("Layout settling (alpha {:.3})", simulation.alpha()));
                }
            });
        });
    }

    pub(in crate::app) fn draw_legend(&self, ui: &mut Ui) {
        egui::CollapsingHeader::new("Legend")
            .default_open(true)
            .show(ui, |ui| {
                for key in self.palette.keys() {
                    ui.horizontal(|ui| {
                        swatch(ui, self.palette.color_for(key), None);
                        ui.label(self.group_label(key));
                    });
                }
                ui.add_space(4.0);
                for severity in LEGEND_SEVERITIES {
                    ui.horizontal(|ui| {
                        swatch(ui, Color32::from_gray(90), Some(severity_color(severity)));
                        ui.label(format!("{severity} alarm"));
                    });
                }
                ui.horizontal(|ui| {
                    swatch(ui, Color32::from_gray(90), Some(SEARCH_HIGHLIGHT));
                    ui.label("Search match");
                });
                ui.label(RichText::new("Dashed relations lack radio or transport config.").small());
            });
    }
}
