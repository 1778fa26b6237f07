use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::DocumentId;

/// Number of leading embedding components shown in a detail preview.
pub const EMBEDDING_PREVIEW_LEN: usize = 5;

/// One processed file as reported by the document store.
///
/// The list endpoint may omit `embedding`; it then deserializes as empty.
/// Fields the client does not model (e.g. a detail record's `title`) are kept
/// in `extra` so a detail record round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub embedding: Vec<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(
        id: impl Into<DocumentId>,
        text: impl Into<String>,
        created_at: impl Into<String>,
        embedding: Vec<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at: created_at.into(),
            embedding,
            extra: BTreeMap::new(),
        }
    }

    /// Leading embedding components with two decimals, e.g. `0.10, 0.20...`.
    pub fn embedding_preview(&self) -> String {
        let head = self
            .embedding
            .iter()
            .take(EMBEDDING_PREVIEW_LEN)
            .map(|value| format!("{value:.2}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{head}...")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocumentId,
    pub text: String,
    pub similarity: f64,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Body of `DELETE /delete-batch`. The store rejects an empty `ids` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBatchRequest {
    pub ids: Vec<DocumentId>,
}

/// Acknowledgement returned by delete endpoints, e.g. `Deleted 2 records`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
