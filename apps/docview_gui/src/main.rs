mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::commands::BackendCommand;
use clap::Parser;
use controller::events::UiEvent;
use crossbeam_channel::bounded;
use docview_core::load_settings;
use eframe::egui;
use tracing_subscriber::EnvFilter;
use ui::DocumentDeskApp;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides the API base from docview.toml / DOCVIEW_API_BASE.
    #[arg(long)]
    api_base: Option<String>,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let settings = load_settings().with_api_base_override(args.api_base);

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(cmd_rx, ui_tx, settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Document Desk")
            .with_inner_size([720.0, 860.0])
            .with_min_inner_size([480.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Document Desk",
        options,
        Box::new(|_cc| Ok(Box::new(DocumentDeskApp::bootstrap(cmd_tx, ui_rx)))),
    )
}
