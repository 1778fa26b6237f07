//! Explicit state container for the document view.
//!
//! Every mutation goes through a transition method so the view's behavior can
//! be exercised without a rendering surface or a network. Async callers take a
//! ticket before dispatching a request and hand it back with the response; a
//! response whose ticket has been superseded is dropped.

use shared::{domain::DocumentId, protocol::Document};

use crate::store::PendingFile;

pub const UPLOAD_LABEL: &str = "Upload";
pub const UPLOAD_BUSY_LABEL: &str = "Uploading...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailTicket(u64);

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    #[default]
    Empty,
    /// A detail fetch is in flight. The previously shown record, if any, stays
    /// visible until the fetch succeeds.
    Loading {
        id: DocumentId,
        previous: Option<Document>,
    },
    Populated(Document),
}

impl Selection {
    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::Empty => None,
            Self::Loading { previous, .. } => previous.as_ref(),
            Self::Populated(doc) => Some(doc),
        }
    }

    pub fn loading_id(&self) -> Option<&DocumentId> {
        match self {
            Self::Loading { id, .. } => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadAffordance {
    pub enabled: bool,
    pub label: &'static str,
}

/// Owned copy of the view state handed to renderers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewSnapshot {
    pub documents: Vec<Document>,
    pub selection: Selection,
    pub upload_pending: bool,
    pub pending_file: Option<String>,
}

impl ViewSnapshot {
    pub fn selected_document(&self) -> Option<&Document> {
        self.selection.document()
    }

    pub fn upload_affordance(&self) -> UploadAffordance {
        upload_affordance(self.upload_pending, self.pending_file.is_some())
    }
}

fn upload_affordance(pending: bool, has_file: bool) -> UploadAffordance {
    UploadAffordance {
        enabled: !pending && has_file,
        label: if pending {
            UPLOAD_BUSY_LABEL
        } else {
            UPLOAD_LABEL
        },
    }
}

#[derive(Debug, Default)]
pub struct ViewState {
    documents: Vec<Document>,
    selection: Selection,
    pending_file: Option<PendingFile>,
    uploads_in_flight: usize,
    refresh_issued: u64,
    refresh_applied: u64,
    detail_issued: u64,
}

impl ViewState {
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn upload_pending(&self) -> bool {
        self.uploads_in_flight > 0
    }

    pub fn pending_file(&self) -> Option<&PendingFile> {
        self.pending_file.as_ref()
    }

    pub fn upload_affordance(&self) -> UploadAffordance {
        upload_affordance(self.upload_pending(), self.pending_file.is_some())
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            documents: self.documents.clone(),
            selection: self.selection.clone(),
            upload_pending: self.upload_pending(),
            pending_file: self.pending_file.as_ref().map(|f| f.filename.clone()),
        }
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.refresh_issued += 1;
        RefreshTicket(self.refresh_issued)
    }

    /// Replaces the registry wholesale. Returns `false` when a newer list
    /// response has already been applied.
    pub fn apply_refresh(&mut self, ticket: RefreshTicket, documents: Vec<Document>) -> bool {
        if ticket.0 <= self.refresh_applied {
            return false;
        }
        self.refresh_applied = ticket.0;
        self.documents = documents;
        true
    }

    pub fn choose_file(&mut self, file: PendingFile) {
        self.pending_file = Some(file);
    }

    pub fn clear_file(&mut self) {
        self.pending_file = None;
    }

    /// Marks an upload in flight and returns the file to send, or `None` when
    /// no file is chosen.
    pub fn begin_upload(&mut self) -> Option<PendingFile> {
        let file = self.pending_file.clone()?;
        self.uploads_in_flight += 1;
        Some(file)
    }

    pub fn end_upload(&mut self) {
        self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
    }

    pub fn begin_detail(&mut self, id: DocumentId) -> DetailTicket {
        self.detail_issued += 1;
        let previous = self.selection.document().cloned();
        self.selection = Selection::Loading { id, previous };
        DetailTicket(self.detail_issued)
    }

    /// Replaces the selection with `document` if `ticket` is the latest detail
    /// request.
    pub fn apply_detail(&mut self, ticket: DetailTicket, document: Document) -> bool {
        if ticket.0 != self.detail_issued {
            return false;
        }
        self.selection = Selection::Populated(document);
        true
    }

    /// Reverts a failed latest detail request to whatever was shown before it.
    pub fn fail_detail(&mut self, ticket: DetailTicket) -> bool {
        if ticket.0 != self.detail_issued {
            return false;
        }
        let Selection::Loading { previous, .. } = &mut self.selection else {
            return false;
        };
        let restored = previous.take();
        self.selection = restored.map_or(Selection::Empty, Selection::Populated);
        true
    }

    /// Clears the selection and invalidates any detail fetch still in flight.
    pub fn close_detail(&mut self) {
        self.detail_issued += 1;
        self.selection = Selection::Empty;
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
