//! Backend commands queued from UI to backend worker.

use shared::domain::DocumentId;
use std::path::PathBuf;

#[derive(Debug)]
pub enum BackendCommand {
    Mount,
    Refresh,
    ChooseFile { path: PathBuf },
    ClearFile,
    Upload,
    Delete { id: DocumentId },
    Select { id: DocumentId },
    CloseDetail,
    Search { query: String },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Mount => "mount",
            BackendCommand::Refresh => "refresh",
            BackendCommand::ChooseFile { .. } => "choose_file",
            BackendCommand::ClearFile => "clear_file",
            BackendCommand::Upload => "upload",
            BackendCommand::Delete { .. } => "delete",
            BackendCommand::Select { .. } => "select",
            BackendCommand::CloseDetail => "close_detail",
            BackendCommand::Search { .. } => "search",
        }
    }
}
