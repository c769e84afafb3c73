#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod config;
mod error;
mod ffmpeg;
mod jobs;
mod playback;
mod project;
mod slides;
mod storage;
mod ui;
mod utils;

use anyhow::anyhow;
use app::EditorApp;
use config::AppConfig;
use eframe::egui;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = AppConfig::load();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    tracing::info!(workspace = %config.workspace_dir.display(), "starting ClipDeck");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("ClipDeck")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "ClipDeck",
        options,
        Box::new(move |cc| Ok(Box::new(EditorApp::new(cc, config, runtime)))),
    )
    .map_err(|e| anyhow!("{}", e))
}
