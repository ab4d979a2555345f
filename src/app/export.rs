use std::path::Path;

use anyhow::Result;
use eframe::egui::vec2;

use crate::encoding::LayoutMode;
use crate::topology::LoadedDataset;

use super::backend::export_svg;
use super::filter::FilterState;
use super::layout::{Viewport, layout_visible};
use super::scene::{Scene, SceneInput, build_scene, group_palette};
use super::selection::HoverTarget;

/// Scene of the whole dataset under default filters, laid out in batch mode
/// so it is settled without running frames.
pub fn snapshot_scene(dataset: &LoadedDataset, width: u32, height: u32) -> Scene {
    let graph = &dataset.graph;
    let mut config = dataset.config.clone();
    config.layout.mode = LayoutMode::Batch;

    let palette = group_palette(graph, &config);
    let filter = FilterState::new(graph);
    let visible = filter.visible(graph);
    let viewport = Viewport {
        size: vec2(width as f32, height as f32),
        panel_width: 0.0,
    };
    let simulation = layout_visible(graph, &config, &palette, &visible, viewport);

    build_scene(
        &SceneInput {
            graph,
            config: &config,
            palette: &palette,
            visible: &visible,
            selected: None,
            hover: &HoverTarget::Nothing,
            matches: None,
        },
        |id| simulation.position(id),
    )
}

pub fn export_snapshot(dataset: &LoadedDataset, path: &Path, width: u32, height: u32) -> Result<()> {
    let scene = snapshot_scene(dataset, width, height);
    export_svg(path, &scene, width, height)
}
