mod app;
mod encoding;
mod topology;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use app::{DataSource, NetgraphApp, export_snapshot};
use encoding::LayoutMode;
use topology::DEFAULT_ADAPTER;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Topology dataset (JSON).
    #[arg(long, default_value = "demos/sample-topology.json")]
    data: PathBuf,
    /// Adapter that understands the dataset format.
    #[arg(long, default_value = DEFAULT_ADAPTER)]
    adapter: String,
    /// Visual config JSON replacing the adapter default.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    layout_mode: Option<LayoutMode>,
    /// Write an SVG snapshot to this path and exit instead of opening a window.
    #[arg(long)]
    export_svg: Option<PathBuf>,
    #[arg(long, default_value_t = 1200)]
    width: u32,
    #[arg(long, default_value_t = 800)]
    height: u32,
}

fn export(source: &DataSource, path: &std::path::Path, width: u32, height: u32) -> anyhow::Result<()> {
    let dataset = source.load()?;
    export_snapshot(&dataset, path, width, height)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let source = DataSource {
        data: args.data,
        adapter: args.adapter,
        config: args.config,
        layout_mode: args.layout_mode,
    };

    if let Some(path) = args.export_svg {
        return match export(&source, &path, args.width, args.height) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                tracing::error!("{error:#}");
                ExitCode::FAILURE
            }
        };
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "netgraph-lens",
        options,
        Box::new(move |cc| Ok(Box::new(NetgraphApp::new(cc, source)))),
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "window closed with an error");
            ExitCode::FAILURE
        }
    }
}
