use std::sync::Arc;

use shared::{
    domain::DocumentId,
    protocol::{Document, SearchHit},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod config;
pub mod error;
pub mod state;
pub mod store;

pub use config::{load_settings, ClientSettings};
pub use error::{StoreError, StoreErrorKind};
pub use state::{Selection, UploadAffordance, ViewSnapshot, ViewState};
pub use store::{DocumentStore, HttpDocumentStore, PendingFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOperation {
    Refresh,
    Upload,
    Delete,
    Detail,
    Search,
    Count,
}

impl ViewOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Upload => "upload",
            Self::Delete => "delete",
            Self::Detail => "detail",
            Self::Search => "search",
            Self::Count => "count",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewEvent {
    StateChanged(ViewSnapshot),
    OperationFailed {
        operation: ViewOperation,
        kind: StoreErrorKind,
        message: String,
    },
}

/// Keeps the document list, pending upload and selected document in sync with
/// the remote store.
///
/// Every action is an independent async task; actions may overlap. Within one
/// mutation the store call always resolves before the follow-up refresh is
/// dispatched. Failures never escape as panics: they leave the state in its
/// previous shape, are logged, and are broadcast as
/// [`ViewEvent::OperationFailed`].
pub struct DocumentView {
    store: Arc<dyn DocumentStore>,
    inner: Mutex<ViewState>,
    events: broadcast::Sender<ViewEvent>,
}

impl DocumentView {
    pub fn new(store: Arc<dyn DocumentStore>) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            store,
            inner: Mutex::new(ViewState::default()),
            events,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Arc<Self> {
        if settings.is_configured() {
            info!(api_base = %settings.api_base, "document view using API base");
        } else {
            warn!(
                api_base = %settings.api_base,
                "no API base configured; every store request will fail"
            );
        }
        Self::new(Arc::new(HttpDocumentStore::new(settings.api_base.clone())))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        self.inner.lock().await.snapshot()
    }

    async fn update<R>(&self, transition: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut guard = self.inner.lock().await;
        let result = transition(&mut guard);
        // Sent under the lock so subscribers see snapshots in transition order.
        let _ = self.events.send(ViewEvent::StateChanged(guard.snapshot()));
        result
    }

    fn report(&self, operation: ViewOperation, err: &StoreError) {
        warn!(
            operation = operation.as_str(),
            endpoint = err.endpoint(),
            status = err.status(),
            "store request failed: {err}"
        );
        let _ = self.events.send(ViewEvent::OperationFailed {
            operation,
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    /// Initial population of the registry.
    pub async fn mount(&self) -> Result<usize, StoreError> {
        info!("mounting document view");
        self.refresh().await
    }

    /// Replaces the registry with the store's current list. On failure the
    /// previous list is kept.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        let ticket = self.inner.lock().await.begin_refresh();
        match self.store.list().await {
            Ok(documents) => {
                let count = documents.len();
                let applied = self
                    .update(|state| state.apply_refresh(ticket, documents))
                    .await;
                if !applied {
                    debug!("discarding list response superseded by a newer refresh");
                }
                Ok(count)
            }
            Err(err) => {
                self.report(ViewOperation::Refresh, &err);
                Err(err)
            }
        }
    }

    async fn refresh_after_mutation(&self) {
        // Already reported; the mutation's own result is what callers see.
        let _ = self.refresh().await;
    }

    pub async fn choose_file(&self, file: PendingFile) {
        debug!(filename = %file.filename, size_bytes = file.bytes.len(), "file chosen");
        self.update(|state| state.choose_file(file)).await;
    }

    pub async fn clear_file(&self) {
        self.update(ViewState::clear_file).await;
    }

    /// Uploads the chosen file, then refreshes the registry.
    ///
    /// Returns `Ok(false)` without any request when no file is chosen. The
    /// chosen file is cleared and the pending flag dropped whatever the
    /// outcome. Concurrent calls are not serialized here; callers gate on
    /// [`ViewSnapshot::upload_affordance`].
    pub async fn upload(&self) -> Result<bool, StoreError> {
        let Some(file) = self.update(ViewState::begin_upload).await else {
            debug!("upload requested without a chosen file");
            return Ok(false);
        };

        info!(filename = %file.filename, size_bytes = file.bytes.len(), "uploading document");
        let result = self.store.upload(file).await;
        if let Err(err) = &result {
            self.report(ViewOperation::Upload, err);
        }

        self.update(ViewState::clear_file).await;
        self.refresh_after_mutation().await;
        self.update(ViewState::end_upload).await;
        result.map(|()| true)
    }

    /// Deletes a document, then refreshes the registry whether or not the
    /// delete succeeded. The selection is left as is, even if it shows the
    /// deleted document.
    pub async fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        info!(document_id = %id, "deleting document");
        let result = self.store.delete(id).await;
        if let Err(err) = &result {
            self.report(ViewOperation::Delete, err);
        }
        self.refresh_after_mutation().await;
        result
    }

    /// Deletes several documents with one batch request, then refreshes the
    /// registry once whether or not the batch succeeded.
    ///
    /// An empty list is rejected locally: it returns `Ok(None)` and makes no
    /// request. Otherwise returns the store's acknowledgement.
    pub async fn delete_many(&self, ids: &[DocumentId]) -> Result<Option<String>, StoreError> {
        if ids.is_empty() {
            debug!("batch delete requested without ids");
            return Ok(None);
        }
        info!(count = ids.len(), "deleting documents");
        let result = self.store.delete_batch(ids).await;
        if let Err(err) = &result {
            self.report(ViewOperation::Delete, err);
        }
        self.refresh_after_mutation().await;
        result.map(Some)
    }

    /// Loads a document's full record into the selection.
    ///
    /// Returns `Ok(false)` when the record arrived after a newer selection or
    /// a close, in which case it is discarded.
    pub async fn select(&self, id: &DocumentId) -> Result<bool, StoreError> {
        let ticket = self.update(|state| state.begin_detail(id.clone())).await;
        match self.store.detail(id).await {
            Ok(document) => {
                let applied = self
                    .update(|state| state.apply_detail(ticket, document))
                    .await;
                if !applied {
                    debug!(document_id = %id, "discarding superseded detail response");
                }
                Ok(applied)
            }
            Err(err) => {
                self.report(ViewOperation::Detail, &err);
                self.update(|state| state.fail_detail(ticket)).await;
                Err(err)
            }
        }
    }

    /// Clears the selection locally; no request is made.
    pub async fn close_detail(&self) {
        self.update(ViewState::close_detail).await;
    }

    /// Similarity search; leaves the registry and selection untouched.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.store.search(query).await.inspect_err(|err| {
            self.report(ViewOperation::Search, err);
        })
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.count().await.inspect_err(|err| {
            self.report(ViewOperation::Count, err);
        })
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.inner.lock().await.documents().to_vec()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
