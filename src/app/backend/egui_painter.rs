use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, Vec2, vec2};

use crate::app::render_utils::{
    blend_color, circle_visible, dashed_circle, edge_visible, world_to_screen,
};
use crate::app::scene::{SceneBackend, SceneEdge, SceneNode};

const SELECTED_HALO: Color32 = Color32::from_rgb(245, 206, 93);
const LABEL_COLOR: Color32 = Color32::from_gray(238);
const EDGE_LABEL_COLOR: Color32 = Color32::from_gray(190);

/// Draws a scene onto an egui canvas through the current pan and zoom.
pub(crate) struct EguiPainter<'a> {
    painter: &'a Painter,
    rect: Rect,
    pan: Vec2,
    zoom: f32,
    pub(crate) drawn_nodes: usize,
    pub(crate) drawn_edges: usize,
}

impl<'a> EguiPainter<'a> {
    pub(crate) fn new(painter: &'a Painter, rect: Rect, pan: Vec2, zoom: f32) -> Self {
        Self {
            painter,
            rect,
            pan,
            zoom,
            drawn_nodes: 0,
            drawn_edges: 0,
        }
    }

    fn to_screen(&self, world: Vec2) -> Pos2 {
        world_to_screen(self.rect, self.pan, self.zoom, world)
    }

    fn stroke_width(&self, width: f32) -> f32 {
        (width * self.zoom.sqrt()).clamp(0.5, 8.0)
    }
}

impl SceneBackend for EguiPainter<'_> {
    fn draw_edge(&mut self, edge: &SceneEdge) {
        let start = self.to_screen(edge.from);
        let end = self.to_screen(edge.to);
        if !edge_visible(self.rect, start, end, 2.5) {
            return;
        }

        let stroke = Stroke::new(self.stroke_width(edge.width), edge.color);
        if edge.dashed {
            self.painter
                .extend(Shape::dashed_line(&[start, end], stroke, 6.0, 4.0));
        } else {
            self.painter.line_segment([start, end], stroke);
        }

        if let Some(label) = &edge.label {
            self.painter.text(
                start + (end - start) * 0.5,
                Align2::CENTER_BOTTOM,
                label,
                FontId::proportional(11.0),
                EDGE_LABEL_COLOR,
            );
        }
        self.drawn_edges += 1;
    }

    fn draw_node(&mut self, node: &SceneNode) {
        let center = self.to_screen(node.position);
        let radius = node.radius * self.zoom;
        if !circle_visible(self.rect, center, radius + 6.0) {
            return;
        }

        let fill = if node.selected {
            blend_color(node.fill, SELECTED_HALO, 0.25)
        } else {
            node.fill
        };
        self.painter.circle_filled(center, radius, fill);
        if node.border_width > 0.0 && node.border != Color32::TRANSPARENT {
            self.painter.circle_stroke(
                center,
                radius,
                Stroke::new(self.stroke_width(node.border_width), node.border),
            );
        }

        if let Some(ring) = node.alarm_ring {
            let stroke = Stroke::new(2.0, ring);
            let ring_radius = radius + 3.0;
            if node.alarm_ring_dashed {
                dashed_circle(self.painter, center, ring_radius, stroke);
            } else {
                self.painter.circle_stroke(center, ring_radius, stroke);
            }
        }

        if node.selected {
            self.painter.circle_stroke(
                center,
                radius + 6.0,
                Stroke::new(1.6, SELECTED_HALO.gamma_multiply(0.8)),
            );
        }
        self.drawn_nodes += 1;
    }

    fn draw_label(&mut self, node: &SceneNode) {
        let center = self.to_screen(node.position);
        let radius = node.radius * self.zoom;
        if !circle_visible(self.rect, center, radius + 40.0) {
            return;
        }
        self.painter.text(
            center + vec2(0.0, radius + 4.0),
            Align2::CENTER_TOP,
            &node.label,
            FontId::proportional(12.0),
            LABEL_COLOR,
        );
    }
}
