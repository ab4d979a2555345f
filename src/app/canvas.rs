use std::collections::HashSet;

use eframe::egui::{self, PointerButton, Rect, RichText, Sense, Ui, vec2};

use super::backend::EguiPainter;
use super::dispatch::{GraphEvent, PointerFrame};
use super::layout::{Viewport, layout_visible};
use super::render_utils::{draw_background, screen_to_world};
use super::scene::{SceneInput, build_scene};
use super::selection::{DragCommand, HoverTarget};
use super::{LayoutKey, ViewModel};

/// Screen pixels of slack when hovering thin relations.
const RELATION_HIT_SLACK: f32 = 4.0;
/// World units kept free around the graph by "Fit view".
const FIT_MARGIN: f32 = 40.0;

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        self.sync_layout(rect);

        if self.layout.tick(self.layout_generation) || self.layout.is_active() {
            ui.ctx().request_repaint();
        }
        if std::mem::take(&mut self.fit_pending) {
            self.fit_view(rect);
        }

        let Some(simulation) = self.layout.simulation() else {
            ui.label("Nothing to show for the current filters.");
            return;
        };
        self.scene = build_scene(
            &SceneInput {
                graph: &self.graph,
                config: &self.config,
                palette: &self.palette,
                visible: &self.visible,
                selected: self.selection.selected(),
                hover: self.selection.hover(),
                matches: self.filter.matches(),
            },
            |id| simulation.position(id),
        );

        let mut backend = EguiPainter::new(&painter, rect, self.pan, self.zoom);
        self.scene.render(&mut backend);
        self.drawn_nodes = backend.drawn_nodes;
        self.drawn_edges = backend.drawn_edges;

        if self.scene.nodes.is_empty() {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No entities match the current filters.",
                egui::FontId::proportional(14.0),
                egui::Color32::from_gray(200),
            );
        }

        let frame = self.pointer_frame(ui, rect, &response);
        let events = self.dispatcher.dispatch(&frame, &self.scene);
        for event in &events {
            self.apply_graph_event(event);
        }
        if events
            .iter()
            .any(|event| !matches!(event, GraphEvent::PointerMove(_)))
        {
            ui.ctx().request_repaint();
        }

        if self.dispatcher.is_dragging() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::Grabbing);
        } else if let HoverTarget::Entity(_) = self.selection.hover() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }
        if self.selection.dragging().is_none() {
            self.show_hover_tooltip(ui.ctx());
        }
    }

    /// Restarts the layout when the visible subset, canvas size or panel
    /// presence changed since the last frame.
    fn sync_layout(&mut self, rect: Rect) {
        let visible = self.filter.visible(&self.graph);
        let panel_width = if self.selection.selected().is_some() {
            Self::DETAILS_WIDTH
        } else {
            0.0
        };
        let key = LayoutKey {
            visible,
            viewport: Viewport {
                size: rect.size(),
                panel_width,
            },
        };
        if self.layout_key.as_ref() == Some(&key) {
            return;
        }

        let shown: HashSet<&str> = key
            .visible
            .entities
            .iter()
            .filter_map(|&index| self.graph.entities.get(index))
            .map(|entity| entity.id.as_str())
            .collect();
        self.selection.forget_hidden_hover(|id| shown.contains(id));

        let simulation = layout_visible(
            &self.graph,
            &self.config,
            &self.palette,
            &key.visible,
            key.viewport,
        );
        self.layout_generation = self.layout.restart(simulation);
        self.visible = key.visible.clone();
        self.layout_key = Some(key);
    }

    /// Zooms and pans so every laid-out entity fits the canvas.
    fn fit_view(&mut self, rect: Rect) {
        let Some(simulation) = self.layout.simulation() else {
            return;
        };
        let mut positions = simulation.positions().map(|(_, position)| position.to_pos2());
        let Some(first) = positions.next() else {
            return;
        };
        let bounds = positions.fold(Rect::from_min_max(first, first), |bounds, point| {
            bounds.union(Rect::from_min_max(point, point))
        });
        let bounds = bounds.expand(FIT_MARGIN);

        self.zoom = (rect.width() / bounds.width())
            .min(rect.height() / bounds.height())
            .clamp(0.05, 6.0);
        self.pan = -bounds.center().to_vec2() * self.zoom;
    }

    fn pointer_frame(&self, ui: &Ui, rect: Rect, response: &egui::Response) -> PointerFrame {
        let screen = if response.hovered() || response.dragged() {
            ui.input(|input| input.pointer.latest_pos())
        } else {
            None
        };
        PointerFrame {
            world: screen.map(|pos| screen_to_world(rect, self.pan, self.zoom, pos)),
            screen,
            tolerance: RELATION_HIT_SLACK / self.zoom,
            clicked: response.clicked_by(PointerButton::Primary),
            drag_started: response.drag_started_by(PointerButton::Primary),
            drag_released: response.drag_stopped_by(PointerButton::Primary),
        }
    }

    fn apply_graph_event(&mut self, event: &GraphEvent) {
        let outcome = self.selection.apply(event);
        if outcome.selection_changed {
            tracing::debug!(selected = ?self.selection.selected(), "selection changed");
            self.filter
                .on_selection_changed(&self.graph, self.selection.selected());
        }

        let Some(command) = outcome.drag else {
            return;
        };
        let Some(simulation) = self.layout.simulation_mut() else {
            return;
        };
        match command {
            DragCommand::Pin { id, position } => {
                simulation.pin(&id, position);
            }
            DragCommand::Release { id } => simulation.unpin(&id),
        }
    }

    fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 6.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(PointerButton::Secondary) || response.dragged_by(PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Small card next to the pointer for the hovered entity or relation.
    fn show_hover_tooltip(&self, ctx: &egui::Context) {
        let Some(pointer) = self.selection.pointer() else {
            return;
        };
        let hover = self.selection.hover();
        if *hover == HoverTarget::Nothing {
            return;
        }

        egui::Area::new(egui::Id::new("graph_hover_card"))
            .order(egui::Order::Tooltip)
            .fixed_pos(pointer + vec2(14.0, 14.0))
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| match hover {
                    HoverTarget::Entity(id) => {
                        if let Some(entity) = self.graph.entity(id) {
                            ui.label(RichText::new(&entity.label).strong());
                            ui.label(format!("group: {}", self.group_label(&entity.group)));
                            ui.label(format!("role: {}", entity.role.label()));
                            if let Some(status) = &entity.status {
                                ui.label(format!("status: {status}"));
                            }
                            if !entity.alarms.is_empty() {
                                ui.label(format!("alarms: {}", entity.alarms.len()));
                            }
                        }
                    }
                    HoverTarget::Relation(key) => {
                        if let Some(relation) = self.graph.relation_by_key(key) {
                            ui.label(
                                RichText::new(format!("{} → {}", relation.source, relation.target))
                                    .strong(),
                            );
                            if let Some(kind) = &relation.kind {
                                ui.label(format!("kind: {kind}"));
                            }
                            ui.label(format!("weight: {}", relation.weight));
                            ui.label(format!(
                                "radio: {}  transport: {}",
                                relation.has_radio_config, relation.has_transport_config
                            ));
                            if !relation.transport.remote_address.is_empty() {
                                ui.label(format!("remote: {}", relation.transport.remote_address));
                            }
                        }
                    }
                    HoverTarget::Nothing => {}
                });
            });
    }

    pub(in crate::app) fn group_label<'a>(&'a self, key: &'a str) -> &'a str {
        self.graph
            .group_info(key)
            .map_or(key, |group| group.label.as_str())
    }
}
