mod egui_painter;
mod svg;

pub(crate) use egui_painter::EguiPainter;
pub use svg::export_svg;
