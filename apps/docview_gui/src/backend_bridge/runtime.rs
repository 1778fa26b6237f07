//! Runtime bridge between UI command queue and backend event intake.

use std::{path::Path, sync::Arc, thread};

use anyhow::{anyhow, Context};
use crossbeam_channel::{Receiver, Sender};
use docview_core::{ClientSettings, DocumentView, PendingFile, ViewEvent};
use tokio::sync::broadcast::error::RecvError;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: ClientSettings) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("failed to build backend runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let view = DocumentView::from_settings(&settings);
            forward_view_events(&view, ui_tx.clone());
            let status = if settings.is_configured() {
                format!("Connected to {}", settings.api_base)
            } else {
                "No API base configured (set DOCVIEW_API_BASE); requests will fail".to_string()
            };
            let _ = ui_tx.try_send(UiEvent::Info(status));

            // Commands run as independent tasks so a slow upload never
            // blocks selection or deletion.
            while let Ok(cmd) = cmd_rx.recv() {
                let view = Arc::clone(&view);
                let ui_tx = ui_tx.clone();
                tokio::spawn(async move {
                    run_command(&view, cmd, &ui_tx).await;
                });
            }
            tracing::info!("ui command queue closed; backend worker stopping");
        });
    });
}

fn forward_view_events(view: &DocumentView, ui_tx: Sender<UiEvent>) {
    let mut events = view.subscribe_events();
    tokio::spawn(async move {
        loop {
            let evt = match events.recv().await {
                Ok(ViewEvent::StateChanged(snapshot)) => UiEvent::StateChanged(snapshot),
                Ok(ViewEvent::OperationFailed {
                    operation,
                    kind,
                    message,
                }) => UiEvent::Error(UiError::from_store_failure(operation, kind, message)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "ui event forwarder lagged behind view events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let _ = ui_tx.try_send(evt);
        }
    });
}

async fn run_command(view: &DocumentView, cmd: BackendCommand, ui_tx: &Sender<UiEvent>) {
    tracing::info!(command = cmd.name(), "backend: running command");
    // Store failures reach the UI through the view's event stream; only
    // local failures and results are reported here.
    match cmd {
        BackendCommand::Mount => {
            let _ = view.mount().await;
        }
        BackendCommand::Refresh => {
            let _ = view.refresh().await;
        }
        BackendCommand::ChooseFile { path } => match read_pending_file(&path).await {
            Ok(file) => view.choose_file(file).await,
            Err(err) => {
                tracing::warn!("backend: choose_file failed: {err:#}");
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::Upload,
                    format!("{err:#}"),
                )));
            }
        },
        BackendCommand::ClearFile => view.clear_file().await,
        BackendCommand::Upload => {
            if let Ok(true) = view.upload().await {
                let _ = ui_tx.try_send(UiEvent::Info("Upload complete".to_string()));
            }
        }
        BackendCommand::Delete { id } => {
            if view.delete(&id).await.is_ok() {
                let _ = ui_tx.try_send(UiEvent::Info(format!("Deleted {id}")));
            }
        }
        BackendCommand::Select { id } => {
            let _ = view.select(&id).await;
        }
        BackendCommand::CloseDetail => view.close_detail().await,
        BackendCommand::Search { query } => {
            if let Ok(hits) = view.search(&query).await {
                let _ = ui_tx.try_send(UiEvent::SearchResults { query, hits });
            }
        }
    }
}

async fn read_pending_file(path: &Path) -> anyhow::Result<PendingFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("invalid file selection: {}", path.display()))?;
    Ok(PendingFile::new(filename, bytes))
}
