mod app;
mod bubbles;
mod config;
mod positions;
mod util;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;

use app::{AppSettings, BubbleMapApp, ViewMode};
use config::LayoutConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Position snapshot to visualize (JSON)
    #[arg(long, default_value = "positions.json")]
    snapshot: PathBuf,

    /// Layout tunables (TOML); `bubbles.toml` is used when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds between snapshot reloads, overriding the config file
    #[arg(long)]
    refresh_secs: Option<u64>,

    /// Seed for the random placement
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Initial view
    #[arg(long, value_enum, default_value_t = ViewMode::Zone)]
    mode: ViewMode,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut layout = LayoutConfig::load_or_default(args.config.as_deref())?;
    if let Some(refresh_secs) = args.refresh_secs {
        layout.refresh.refresh_secs = refresh_secs;
        layout = layout.validated();
    }

    info!(
        snapshot = %args.snapshot.display(),
        refresh_secs = layout.refresh.refresh_secs,
        seed = args.seed,
        mode = ?args.mode,
        "starting wallet bubbles"
    );

    let settings = AppSettings {
        snapshot_path: args.snapshot,
        layout,
        seed: args.seed,
        mode: args.mode,
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "wallet bubbles",
        options,
        Box::new(move |cc| Ok(Box::new(BubbleMapApp::new(cc, settings)))),
    )
    .map_err(|error| anyhow!("failed to start viewer: {error}"))
}
