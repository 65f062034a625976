pub mod store;
pub mod trace;

pub use store::{ArtifactCollection, ArtifactStore};
pub use trace::{EvaluationArtifact, ResultPayload, ToolInvocation, ToolResult, TraceBuilder};

use thiserror::Error;

use crate::history::CallId;
use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("session is not completed (state: {0:?})")]
    SessionNotCompleted(SessionState),

    #[error("tool call {0} has no recorded result")]
    IncompleteTrace(CallId),

    #[error("collection file does not conform to the expected shape: {0}")]
    CollectionParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
