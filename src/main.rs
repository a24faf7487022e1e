mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use app::DashboardApp;
use clap::Parser;
use eframe::egui;
use epidash::config::DashboardConfig;
use state::AppState;

/// Epidemiological dashboard over hospital visit records.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Visits dataset (.csv, .zip or .parquet)
    #[arg(long)]
    data: Option<PathBuf>,

    /// GeoJSON municipality boundaries
    #[arg(long)]
    boundaries: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(data) = cli.data {
        config.dataset_path = data;
    }
    if let Some(boundaries) = cli.boundaries {
        config.boundary_path = boundaries;
    }

    let mut state = AppState::new(config);
    state.load_configured();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Epidash – Hospital Visits Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("running the dashboard: {e}"))
}
