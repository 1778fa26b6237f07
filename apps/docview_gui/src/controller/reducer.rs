//! Applies backend events to the state the UI renders from.

use docview_core::ViewSnapshot;
use shared::protocol::SearchHit;

use crate::controller::events::{UiError, UiEvent};

/// Tracks an upload queued from this UI until the worker reports it done.
///
/// Snapshots from unrelated actions can arrive between the click and the
/// worker starting the upload; they must not re-enable the upload control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadGate {
    #[default]
    Open,
    Dispatched,
    InFlight,
}

impl UploadGate {
    fn observe(self, snapshot: &ViewSnapshot) -> Self {
        match (self, snapshot.upload_pending) {
            (Self::Dispatched | Self::InFlight, true) => Self::InFlight,
            (Self::InFlight, false) => Self::Open,
            // The queued upload found no file and made no request.
            (Self::Dispatched, false) if snapshot.pending_file.is_none() => Self::Open,
            (gate, _) => gate,
        }
    }

    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

#[derive(Debug, Default)]
pub struct DeskState {
    pub view: ViewSnapshot,
    pub upload_gate: UploadGate,
    pub status: String,
    pub last_error: Option<UiError>,
    pub search_query: String,
    pub search_hits: Vec<SearchHit>,
    pub last_search: Option<String>,
}

pub fn reduce(state: &mut DeskState, event: UiEvent) {
    match event {
        UiEvent::Info(message) => {
            state.status = message;
        }
        UiEvent::StateChanged(snapshot) => {
            state.upload_gate = state.upload_gate.observe(&snapshot);
            state.view = snapshot;
            if !state.upload_gate.is_open() {
                state.view.upload_pending = true;
            }
        }
        UiEvent::SearchResults { query, hits } => {
            state.status = match hits.len() {
                0 => format!("No matches for \"{query}\""),
                1 => format!("1 match for \"{query}\""),
                n => format!("{n} matches for \"{query}\""),
            };
            state.search_hits = hits;
            state.last_search = Some(query);
        }
        UiEvent::Error(err) => {
            state.status = err.summary();
            state.last_error = Some(err);
        }
    }
}
