//! UI/backend events and error modeling for the document desk controller.

use docview_core::{StoreErrorKind, ViewOperation, ViewSnapshot};
use shared::protocol::SearchHit;

pub enum UiEvent {
    Info(String),
    StateChanged(ViewSnapshot),
    SearchResults { query: String, hits: Vec<SearchHit> },
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Server,
    Payload,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Refresh,
    Upload,
    Delete,
    Detail,
    Search,
    General,
}

impl From<ViewOperation> for UiErrorContext {
    fn from(operation: ViewOperation) -> Self {
        match operation {
            ViewOperation::Refresh => Self::Refresh,
            ViewOperation::Upload => Self::Upload,
            ViewOperation::Delete => Self::Delete,
            ViewOperation::Detail => Self::Detail,
            ViewOperation::Search => Self::Search,
            ViewOperation::Count => Self::General,
        }
    }
}

impl UiErrorContext {
    pub fn label(self) -> &'static str {
        match self {
            Self::BackendStartup => "Backend startup",
            Self::Refresh => "Refreshing documents",
            Self::Upload => "Upload",
            Self::Delete => "Delete",
            Self::Detail => "Loading document",
            Self::Search => "Search",
            Self::General => "Request",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_store_failure(
        operation: ViewOperation,
        kind: StoreErrorKind,
        message: impl Into<String>,
    ) -> Self {
        let category = match kind {
            StoreErrorKind::NetworkFailure => UiErrorCategory::Transport,
            StoreErrorKind::NonSuccessStatus => UiErrorCategory::Server,
            StoreErrorKind::MalformedPayload => UiErrorCategory::Payload,
        };
        Self {
            category,
            context: operation.into(),
            message: message.into(),
        }
    }

    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("no such file")
            || message_lower.contains("permission denied")
            || message_lower.contains("failed to read")
            || message_lower.contains("invalid")
            || message_lower.contains("missing")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("connection")
            || message_lower.contains("timed out")
            || message_lower.contains("dns")
            || message_lower.contains("runtime")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn summary(&self) -> String {
        format!("{} failed: {}", self.context.label(), self.message)
    }
}
