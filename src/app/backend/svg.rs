use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui::{Rect, pos2};

use crate::app::scene::{Scene, SceneBackend, SceneEdge, SceneNode};
use crate::encoding::{opacity, to_css};

const MARGIN: f32 = 40.0;
const BACKGROUND: &str = "#f8fafc";
const LABEL_FILL: &str = "#475569";

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Collects SVG elements; the first formatting failure sticks.
struct SvgBackend {
    out: String,
    status: fmt::Result,
}

impl SvgBackend {
    fn write(&mut self, element: fmt::Arguments<'_>) {
        if self.status.is_ok() {
            self.status = self.out.write_fmt(element);
        }
    }
}

impl SceneBackend for SvgBackend {
    fn draw_edge(&mut self, edge: &SceneEdge) {
        let dash = if edge.dashed {
            " stroke-dasharray=\"6 4\""
        } else {
            ""
        };
        self.write(format_args!(
            "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"{}\" stroke-opacity=\"{:.2}\" stroke-width=\"{:.2}\"{} />\n",
            edge.from.x,
            edge.from.y,
            edge.to.x,
            edge.to.y,
            to_css(edge.color),
            opacity(edge.color),
            edge.width,
            dash,
        ));
        if let Some(label) = &edge.label {
            let mid = edge.from + (edge.to - edge.from) * 0.5;
            self.write(format_args!(
                "  <text x=\"{:.1}\" y=\"{:.1}\" fill=\"{}\" font-size=\"10\" text-anchor=\"middle\">{}</text>\n",
                mid.x,
                mid.y - 3.0,
                LABEL_FILL,
                escape_xml(label),
            ));
        }
    }

    fn draw_node(&mut self, node: &SceneNode) {
        self.write(format_args!(
            "  <circle data-id=\"{}\" cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"{}\" fill-opacity=\"{:.2}\" stroke=\"{}\" stroke-width=\"{:.2}\" />\n",
            escape_xml(&node.id),
            node.position.x,
            node.position.y,
            node.radius,
            to_css(node.fill),
            opacity(node.fill),
            to_css(node.border),
            node.border_width,
        ));
        if let Some(ring) = node.alarm_ring {
            let dash = if node.alarm_ring_dashed {
                " stroke-dasharray=\"4 3\""
            } else {
                ""
            };
            self.write(format_args!(
                "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"{} />\n",
                node.position.x,
                node.position.y,
                node.radius + 3.0,
                to_css(ring),
                dash,
            ));
        }
    }

    fn draw_label(&mut self, node: &SceneNode) {
        self.write(format_args!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" fill=\"{}\" font-size=\"11\" text-anchor=\"middle\" dominant-baseline=\"hanging\">{}</text>\n",
            node.position.x,
            node.position.y + node.radius + 4.0,
            LABEL_FILL,
            escape_xml(&node.label),
        ));
    }
}

/// Standalone SVG document for `scene`. The view box fits the scene bounds,
/// the output is `width` by `height` pixels.
pub fn render_svg(scene: &Scene, width: u32, height: u32) -> Result<String> {
    let bounds = scene
        .bounds()
        .unwrap_or_else(|| Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)))
        .expand(MARGIN);

    let mut backend = SvgBackend {
        out: String::new(),
        status: Ok(()),
    };
    backend.write(format_args!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"{:.1} {:.1} {:.1} {:.1}\" font-family=\"Inter, system-ui, sans-serif\">\n  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\" />\n",
        width,
        height,
        bounds.min.x,
        bounds.min.y,
        bounds.width(),
        bounds.height(),
        bounds.min.x,
        bounds.min.y,
        bounds.width(),
        bounds.height(),
        BACKGROUND,
    ));
    scene.render(&mut backend);
    backend.write(format_args!("</svg>\n"));

    backend.status.context("failed to format svg document")?;
    Ok(backend.out)
}

pub fn export_svg(path: &Path, scene: &Scene, width: u32, height: u32) -> Result<()> {
    let svg = render_svg(scene, width, height)?;
    fs::write(path, svg).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        nodes = scene.nodes.len(),
        edges = scene.edges.len(),
        "svg exported"
    );
    Ok(())
}
