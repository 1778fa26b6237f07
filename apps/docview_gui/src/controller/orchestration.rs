//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};
use shared::domain::DocumentId;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::reducer::{DeskState, UploadGate};

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) -> bool {
    let cmd_name = cmd.name();

    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            true
        }
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend worker disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
            false
        }
    }
}

/// Queues an upload only when the upload control is enabled.
///
/// Closes the state's [`UploadGate`]; it stays closed until the worker's
/// snapshots show this upload started and finished, so no second click can
/// queue the same file again.
pub fn dispatch_upload(cmd_tx: &Sender<BackendCommand>, state: &mut DeskState) -> bool {
    if !state.upload_gate.is_open() || !state.view.upload_affordance().enabled {
        return false;
    }
    let queued = dispatch_backend_command(cmd_tx, BackendCommand::Upload, &mut state.status);
    if queued {
        state.upload_gate = UploadGate::Dispatched;
        state.view.upload_pending = true;
    }
    queued
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Select,
    Delete,
}

/// A click on a row's delete button never also selects the row, even though
/// the button lies inside the row's clickable area.
pub fn resolve_row_action(row_clicked: bool, delete_clicked: bool) -> Option<RowAction> {
    if delete_clicked {
        Some(RowAction::Delete)
    } else if row_clicked {
        Some(RowAction::Select)
    } else {
        None
    }
}

pub fn row_command(action: RowAction, id: DocumentId) -> BackendCommand {
    match action {
        RowAction::Select => BackendCommand::Select { id },
        RowAction::Delete => BackendCommand::Delete { id },
    }
}
