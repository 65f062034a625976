use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kind recorded when an in-flight invocation is cancelled.
pub const CANCELLED_KIND: &str = "Cancelled";

/// Failure surfaced by a tool backend during invocation.
///
/// Backends that wrap a foreign runtime can carry the runtime's own error
/// class name through [`ToolFailure::raised`]; everything else maps to a
/// fixed kind via [`ToolFailure::kind`].
#[derive(Debug, Error)]
pub enum ToolFailure {
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind}: {message}")]
    Raised { kind: String, message: String },
}

impl ToolFailure {
    pub fn raised(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::InvalidArguments(_) => "InvalidArguments",
            Self::Io(_) => "Io",
            Self::Serialization(_) => "Serialization",
            Self::Raised { kind, .. } => kind,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::InvalidArguments(message) => message.clone(),
            Self::Io(error) => error.to_string(),
            Self::Serialization(error) => error.to_string(),
            Self::Raised { message, .. } => message.clone(),
        }
    }
}

/// Normalized error shape recorded in history entries and exported artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: String,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(CANCELLED_KIND, "tool invocation was cancelled")
    }
}

impl From<&ToolFailure> for ErrorDescriptor {
    fn from(failure: &ToolFailure) -> Self {
        Self {
            kind: failure.kind().to_string(),
            message: failure.message(),
        }
    }
}
