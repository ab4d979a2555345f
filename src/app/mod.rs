use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Vec2};

use crate::encoding::{GroupPalette, LayoutMode, VisualConfig};
use crate::topology::{LoadedDataset, TopologyGraph, VisibleSubset, load_dataset};

mod backend;
mod canvas;
mod dispatch;
mod export;
mod filter;
mod layout;
mod physics;
mod render_utils;
mod scene;
mod selection;
mod ui;

pub use export::export_snapshot;

use dispatch::Dispatcher;
use filter::FilterState;
use layout::Viewport;
use physics::LayoutEngine;
use scene::{Scene, group_palette};
use selection::SelectionState;

/// Where the dataset comes from and how to read it.
#[derive(Clone, Debug)]
pub struct DataSource {
    pub data: PathBuf,
    pub adapter: String,
    pub config: Option<PathBuf>,
    pub layout_mode: Option<LayoutMode>,
}

impl DataSource {
    pub fn load(&self) -> anyhow::Result<LoadedDataset> {
        let mut dataset = load_dataset(&self.data, &self.adapter, self.config.as_deref())?;
        if let Some(mode) = self.layout_mode {
            dataset.config.layout.mode = mode;
        }
        Ok(dataset)
    }
}

pub struct NetgraphApp {
    source: DataSource,
    state: AppState,
    reload_rx: Option<Receiver<Result<LoadedDataset, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<LoadedDataset, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

/// Inputs that force a fresh layout when any of them changes.
#[derive(Clone, Debug, PartialEq)]
struct LayoutKey {
    visible: VisibleSubset,
    viewport: Viewport,
}

struct ViewModel {
    graph: TopologyGraph,
    config: VisualConfig,
    palette: GroupPalette,
    filter: FilterState,
    selection: SelectionState,
    dispatcher: Dispatcher,
    layout: LayoutEngine,
    layout_generation: u64,
    layout_key: Option<LayoutKey>,
    visible: VisibleSubset,
    scene: Scene,
    search: String,
    pan: Vec2,
    zoom: f32,
    fit_pending: bool,
    drawn_nodes: usize,
    drawn_edges: usize,
}

impl ViewModel {
    const DETAILS_WIDTH: f32 = 340.0;

    fn new(dataset: LoadedDataset) -> Self {
        let LoadedDataset { graph, config } = dataset;
        let palette = group_palette(&graph, &config);
        let filter = FilterState::new(&graph);
        let visible = filter.visible(&graph);

        Self {
            graph,
            config,
            palette,
            filter,
            selection: SelectionState::default(),
            dispatcher: Dispatcher::default(),
            layout: LayoutEngine::default(),
            layout_generation: 0,
            layout_key: None,
            visible,
            scene: Scene::default(),
            search: String::new(),
            pan: Vec2::ZERO,
            zoom: 1.0,
            fit_pending: false,
            drawn_nodes: 0,
            drawn_edges: 0,
        }
    }

    fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_loading: bool) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_header(ui, reload_requested, is_loading));

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));

        if self.selection.selected().is_some() {
            self.draw_details(ctx);
        }
    }

    /// Selects `id` (or clears) and lets the filter follow the new selection.
    fn select_entity(&mut self, id: Option<String>) {
        if self.selection.select(id) {
            tracing::debug!(selected = ?self.selection.selected(), "selection changed");
            self.filter
                .on_selection_changed(&self.graph, self.selection.selected());
        }
    }

    fn set_search(&mut self, query: String) {
        self.search = query;
        self.filter.set_search(&self.graph, &self.search);
    }

    fn request_relayout(&mut self) {
        self.layout_key = None;
    }
}

impl NetgraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, source: DataSource) -> Self {
        let state = Self::start_load(source.clone());
        Self {
            source,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: DataSource) -> Receiver<Result<LoadedDataset, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = source.load().map_err(|error| format!("{error:#}"));
            if let Err(error) = &result {
                tracing::warn!(%error, "dataset load failed");
            }
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: DataSource) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }
}

impl eframe::App for NetgraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => {
                        transition = Some(match result {
                            Ok(dataset) => AppState::Ready(Box::new(ViewModel::new(dataset))),
                            Err(error) => AppState::Error(error),
                        });
                    }
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading topology...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load topology");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.source.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.source.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            transition = Some(match result {
                                Ok(dataset) => AppState::Ready(Box::new(ViewModel::new(dataset))),
                                Err(error) => AppState::Error(error),
                            });
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
