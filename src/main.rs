mod app;
mod config;
mod error;
mod upload;

use anyhow::{anyhow, Context, Result};
use app::UploadWidget;
use config::UploaderConfig;
use eframe::egui;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use upload::{RestBundleClient, UploadWorkflow};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = UploaderConfig::load()?;
    if config.worksheet_uuid.is_empty() {
        warn!("No worksheet configured, uploads will be rejected by the server");
    }
    info!("Using bundle service at {}", config.server_url);

    let service = Arc::new(RestBundleClient::new(&config)?);
    let workflow = UploadWorkflow::new(service, config.target());
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 640.0])
            .with_min_inner_size([420.0, 520.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    let worksheet = config.worksheet_uuid.clone();
    eframe::run_native(
        "Bundle Uploader",
        options,
        Box::new(move |_cc| {
            Box::new(UploadWidget::new(workflow, runtime, move || {
                info!("Reloading worksheet {}", worksheet);
            }))
        }),
    )
    .map_err(|e| anyhow!("Failed to run uploader window: {}", e))
}
