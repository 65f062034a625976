use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorDescriptor;
use crate::history::{CallId, HistoryEntry};
use crate::session::{SessionState, SimulationSession};

use super::ExportError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub call_id: CallId,
    pub tool_name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub call_id: CallId,
    pub payload: ResultPayload,
}

/// Either the tool's unmodified return value or its normalized error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultPayload {
    Success { result: Value },
    Error { error: ErrorDescriptor },
}

/// Immutable record of one completed session, suitable for automated
/// evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationArtifact {
    pub artifact_id: String,
    pub user_query: String,
    pub final_response: Option<String>,
    #[serde(default)]
    pub tool_invocations: Vec<ToolInvocation>,
    #[serde(default)]
    pub tool_results: Vec<ToolResult>,
    /// Epoch seconds.
    pub created_at: i64,
}

/// Assembles an [`EvaluationArtifact`] from a completed session with a single
/// linear scan of its history.
pub struct TraceBuilder;

impl TraceBuilder {
    pub fn build(session: &SimulationSession) -> Result<EvaluationArtifact, ExportError> {
        if session.state() != SessionState::Completed {
            return Err(ExportError::SessionNotCompleted(session.state()));
        }

        let mut user_query = String::new();
        let mut final_response = None;
        let mut tool_invocations = Vec::new();
        let mut tool_results = Vec::new();

        for entry in session.history() {
            match entry {
                HistoryEntry::UserQuery { content, .. } => user_query = content.clone(),
                HistoryEntry::ToolCall {
                    call_id,
                    tool_name,
                    arguments,
                    ..
                } => tool_invocations.push(ToolInvocation {
                    call_id: *call_id,
                    tool_name: tool_name.clone(),
                    arguments: arguments.clone(),
                }),
                HistoryEntry::ToolOutput { call_id, result, .. } => tool_results.push(ToolResult {
                    call_id: *call_id,
                    payload: ResultPayload::Success { result: result.clone() },
                }),
                HistoryEntry::ToolError {
                    call_id,
                    kind,
                    message,
                    ..
                } => tool_results.push(ToolResult {
                    call_id: *call_id,
                    payload: ResultPayload::Error {
                        error: ErrorDescriptor::new(kind.clone(), message.clone()),
                    },
                }),
                HistoryEntry::FinalResponse { content, .. } => {
                    final_response = Some(content.clone());
                }
            }
        }

        // Should be unreachable: the session refuses to complete with a
        // pending call. Kept as a consistency check on the exported shape.
        for invocation in &tool_invocations {
            if !tool_results
                .iter()
                .any(|result| result.call_id == invocation.call_id)
            {
                return Err(ExportError::IncompleteTrace(invocation.call_id));
            }
        }

        Ok(EvaluationArtifact {
            artifact_id: artifact_id_for(session.agent_name(), session.started_at()),
            user_query,
            final_response,
            tool_invocations,
            tool_results,
            created_at: Utc::now().timestamp(),
        })
    }
}

static RE_CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static RE_NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Deterministic id: `{snake_case_agent}_{start_instant}`. Same agent name
/// and start instant always yield the same id.
fn artifact_id_for(agent_name: &str, started_at: DateTime<Utc>) -> String {
    let name = if agent_name.is_empty() { "unknown" } else { agent_name };
    let snake = RE_CAMEL_BOUNDARY.replace_all(name, "${1}_${2}").to_lowercase();
    let slug = RE_NON_SLUG.replace_all(&snake, "_");
    let slug = slug.trim_matches('_');
    let slug = if slug.is_empty() { "unknown" } else { slug };
    format!("{}_{}", slug, started_at.format("%Y%m%dT%H%M%SZ"))
}
