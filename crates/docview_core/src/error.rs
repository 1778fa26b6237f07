use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NetworkFailure,
    NonSuccessStatus,
    MalformedPayload,
}

/// Failure of a single call against the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {endpoint} could not be completed: {reason}")]
    NetworkFailure { endpoint: String, reason: String },
    #[error("{endpoint} responded with status {status}{}", detail_suffix(.detail))]
    NonSuccessStatus {
        endpoint: String,
        status: u16,
        detail: Option<String>,
    },
    #[error("{endpoint} returned a malformed payload: {source}")]
    MalformedPayload {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(": {detail}"))
        .unwrap_or_default()
}

impl StoreError {
    pub fn network(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::NetworkFailure {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::NetworkFailure { .. } => StoreErrorKind::NetworkFailure,
            Self::NonSuccessStatus { .. } => StoreErrorKind::NonSuccessStatus,
            Self::MalformedPayload { .. } => StoreErrorKind::MalformedPayload,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::NetworkFailure { endpoint, .. }
            | Self::NonSuccessStatus { endpoint, .. }
            | Self::MalformedPayload { endpoint, .. } => endpoint,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NonSuccessStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
