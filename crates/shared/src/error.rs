use serde::{Deserialize, Serialize};

/// Error body returned by the document store on non-success responses,
/// e.g. `{"detail": "Record not found"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreErrorBody {
    pub detail: String,
}

impl StoreErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Best-effort decode; store error bodies are not guaranteed to be JSON.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}
