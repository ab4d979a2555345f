use eframe::egui::{self, Align2, Context, RichText, Ui};

use crate::encoding::severity_color;
use crate::topology::Entity;

use super::super::ViewModel;

const NEIGHBOUR_ROWS: usize = 40;

impl ViewModel {
    /// Overlay on the right edge of the canvas. The layout centre shifts left
    /// by its width while it is open.
    pub(in crate::app) fn draw_details(&mut self, ctx: &Context) {
        let Some(selected_id) = self.selection.selected().map(str::to_owned) else {
            return;
        };

        let mut picked = None;
        let mut close = false;
        egui::Window::new("Selection")
            .anchor(Align2::RIGHT_TOP, [-8.0, 8.0])
            .min_width(Self::DETAILS_WIDTH - 24.0)
            .max_width(Self::DETAILS_WIDTH - 24.0)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                let Some(entity) = self.graph.entity(&selected_id) else {
                    ui.label("Selected entity no longer exists.");
                    return;
                };
                self.draw_entity_summary(ui, entity);
                ui.separator();
                picked = self.draw_neighbours(ui, entity);
                ui.separator();
                egui::CollapsingHeader::new("Raw attributes")
                    .default_open(false)
                    .show(ui, |ui| {
                        let text = serde_json::to_string_pretty(&entity.payload)
                            .unwrap_or_else(|_| entity.payload.to_string());
                        egui::ScrollArea::vertical()
                            .id_salt("payload_scroll")
                            .max_height(220.0)
                            .show(ui, |ui| ui.monospace(text));
                    });
                ui.add_space(4.0);
                close = ui.button("Clear selection").clicked();
            });

        if close {
            self.select_entity(None);
        } else if picked.is_some() {
            self.select_entity(picked);
        }
    }

    fn draw_entity_summary(&self, ui: &mut Ui, entity: &Entity) {
        ui.label(RichText::new(&entity.label).strong());
        ui.small(entity.id.as_str());
        ui.add_space(6.0);

        egui::Grid::new("entity_fields")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                ui.label("Group");
                ui.label(self.group_label(&entity.group));
                ui.end_row();
                ui.label("Role");
                ui.label(entity.role.label());
                ui.end_row();
                if let Some(kind) = &entity.entity_type {
                    ui.label("Type");
                    ui.label(kind.as_str());
                    ui.end_row();
                }
                if let Some(status) = &entity.status {
                    ui.label("Status");
                    let text = RichText::new(status.as_str());
                    ui.label(if entity.has_active_alarm {
                        text.color(severity_color(status))
                    } else {
                        text
                    });
                    ui.end_row();
                }
                for (key, value) in &entity.metrics {
                    ui.label(key.as_str());
                    ui.label(format!("{value}"));
                    ui.end_row();
                }
            });

        if entity.alarms.is_empty() {
            return;
        }
        ui.add_space(6.0);
        ui.label(RichText::new(format!("Alarms ({})", entity.alarms.len())).strong());
        for alarm in &entity.alarms {
            ui.horizontal_wrapped(|ui| {
                ui.label(
                    RichText::new(alarm.severity.as_str())
                        .color(severity_color(&alarm.severity))
                        .strong(),
                );
                ui.label(alarm.cause.as_str());
                if !alarm.code.is_empty() {
                    ui.small(format!("code {}", alarm.code));
                }
                if !alarm.time.is_empty() {
                    ui.small(alarm.time.as_str());
                }
            });
        }
    }

    /// Lists related entities; returns the one clicked, if any.
    fn draw_neighbours(&self, ui: &mut Ui, entity: &Entity) -> Option<String> {
        let mut neighbours = self.graph.neighbors(&entity.id);
        neighbours.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));

        ui.label(RichText::new(format!("Neighbours ({})", neighbours.len())).strong());
        if neighbours.is_empty() {
            ui.label("No related entities.");
            return None;
        }

        let mut picked = None;
        egui::ScrollArea::vertical()
            .id_salt("neighbour_scroll")
            .max_height(200.0)
            .auto_shrink([false, true])
            .show_rows(ui, 20.0, neighbours.len().min(NEIGHBOUR_ROWS), |ui, rows| {
                for neighbour in &neighbours[rows] {
                    let text = format!("{}  [{}]", neighbour.label, self.group_label(&neighbour.group));
                    let link = ui.link(text).on_hover_text(neighbour.id.as_str());
                    if link.clicked() {
                        picked = Some(neighbour.id.clone());
                    }
                }
            });
        picked
    }
}
