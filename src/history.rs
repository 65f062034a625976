use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type CallId = Uuid;

pub fn new_call_id() -> CallId {
    Uuid::new_v4()
}

/// One immutable, time-ordered fact recorded during a session.
///
/// Entries are append-only: a `ToolCall` is later *answered* by exactly one
/// `ToolOutput` or `ToolError` carrying the same `call_id`, but no entry is
/// ever revised in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEntry {
    UserQuery {
        content: String,
        timestamp: DateTime<Utc>,
    },
    ToolCall {
        call_id: CallId,
        tool_name: String,
        arguments: Value,
        timestamp: DateTime<Utc>,
    },
    ToolOutput {
        call_id: CallId,
        result: Value,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    ToolError {
        call_id: CallId,
        kind: String,
        message: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    FinalResponse {
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl HistoryEntry {
    pub fn user_query(content: impl Into<String>) -> Self {
        Self::UserQuery {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn tool_call(call_id: CallId, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCall {
            call_id,
            tool_name: tool_name.into(),
            arguments,
            timestamp: Utc::now(),
        }
    }

    pub fn tool_output(call_id: CallId, result: Value, duration_ms: u64) -> Self {
        Self::ToolOutput {
            call_id,
            result,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn tool_error(
        call_id: CallId,
        kind: impl Into<String>,
        message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self::ToolError {
            call_id,
            kind: kind.into(),
            message: message.into(),
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn final_response(content: impl Into<String>) -> Self {
        Self::FinalResponse {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// The correlation id, for call and result entries.
    pub fn call_id(&self) -> Option<CallId> {
        match self {
            Self::ToolCall { call_id, .. }
            | Self::ToolOutput { call_id, .. }
            | Self::ToolError { call_id, .. } => Some(*call_id),
            _ => None,
        }
    }

    /// Whether this entry settles a prior `ToolCall`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ToolOutput { .. } | Self::ToolError { .. })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::UserQuery { timestamp, .. }
            | Self::ToolCall { timestamp, .. }
            | Self::ToolOutput { timestamp, .. }
            | Self::ToolError { timestamp, .. }
            | Self::FinalResponse { timestamp, .. } => *timestamp,
        }
    }
}
