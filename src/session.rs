use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::history::{new_call_id, CallId, HistoryEntry};
use crate::runner::InvocationOutcome;
use crate::tools::ToolCatalog;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} from state {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },

    #[error("{0} tool call(s) still awaiting a result")]
    PendingInvocation(usize),

    #[error("unknown call id: {0}")]
    UnknownCall(CallId),

    #[error("call {0} already has a result")]
    CallAlreadyResolved(CallId),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    SelectingAgent,
    AwaitingQuery,
    Active,
    Completed,
}

/// State for a single roleplay run.
///
/// History is strictly append-only and chronologically ordered. `Completed` is
/// terminal: a new run is a fresh instance, never a reset of an old one.
#[derive(Debug)]
pub struct SimulationSession {
    id: Uuid,
    agent_name: String,
    tools: ToolCatalog,
    state: SessionState,
    history: Vec<HistoryEntry>,
    started_at: DateTime<Utc>,
}

impl SimulationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_name: String::new(),
            tools: ToolCatalog::new(),
            state: SessionState::SelectingAgent,
            history: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn tools(&self) -> &ToolCatalog {
        &self.tools
    }

    /// Read-only chronological snapshot.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn select_agent(
        &mut self,
        name: impl Into<String>,
        tools: ToolCatalog,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::SelectingAgent {
            return Err(SessionError::InvalidTransition {
                action: "select agent",
                state: self.state,
            });
        }
        self.agent_name = name.into();
        self.tools = tools;
        self.state = SessionState::AwaitingQuery;
        info!(session = %self.id, agent = %self.agent_name, "agent selected");
        Ok(())
    }

    /// Record the opening query and enter the simulation loop.
    ///
    /// The session start instant is pinned here; the exported artifact id is
    /// derived from it.
    pub fn submit_query(&mut self, content: impl Into<String>) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingQuery {
            return Err(SessionError::InvalidTransition {
                action: "submit query",
                state: self.state,
            });
        }
        self.history.push(HistoryEntry::user_query(content));
        self.started_at = Utc::now();
        self.state = SessionState::Active;
        info!(session = %self.id, "session active");
        Ok(())
    }

    /// Append a `ToolCall` entry and hand back its correlation id.
    pub fn begin_tool_call(
        &mut self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<CallId, SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::InvalidTransition {
                action: "invoke tool",
                state: self.state,
            });
        }
        if self.tools.get(tool_name).is_none() {
            return Err(SessionError::UnknownTool(tool_name.to_string()));
        }
        let call_id = new_call_id();
        self.history
            .push(HistoryEntry::tool_call(call_id, tool_name, arguments));
        debug!(session = %self.id, call = %call_id, tool = %tool_name, "tool call recorded");
        Ok(call_id)
    }

    /// Attach the terminal entry for a previously begun call.
    pub fn resolve_tool_call(
        &mut self,
        call_id: CallId,
        outcome: InvocationOutcome,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::InvalidTransition {
                action: "resolve tool call",
                state: self.state,
            });
        }

        let called = self
            .history
            .iter()
            .any(|entry| matches!(entry, HistoryEntry::ToolCall { call_id: id, .. } if *id == call_id));
        if !called {
            return Err(SessionError::UnknownCall(call_id));
        }
        let resolved = self
            .history
            .iter()
            .any(|entry| entry.is_terminal() && entry.call_id() == Some(call_id));
        if resolved {
            return Err(SessionError::CallAlreadyResolved(call_id));
        }

        let entry = match outcome {
            InvocationOutcome::Success { result, duration_ms } => {
                HistoryEntry::tool_output(call_id, result, duration_ms)
            }
            InvocationOutcome::Failure { error, duration_ms } => {
                HistoryEntry::tool_error(call_id, error.kind, error.message, duration_ms)
            }
            InvocationOutcome::Cancelled { duration_ms } => {
                let error = crate::error::ErrorDescriptor::cancelled();
                HistoryEntry::tool_error(call_id, error.kind, error.message, duration_ms)
            }
        };
        self.history.push(entry);
        debug!(session = %self.id, call = %call_id, "tool call resolved");
        Ok(())
    }

    /// Record the closing response. Every prior call must already have its
    /// terminal entry.
    pub fn submit_final_response(&mut self, content: impl Into<String>) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::InvalidTransition {
                action: "submit final response",
                state: self.state,
            });
        }
        let pending = self.pending_calls();
        if !pending.is_empty() {
            return Err(SessionError::PendingInvocation(pending.len()));
        }
        self.history.push(HistoryEntry::final_response(content));
        self.state = SessionState::Completed;
        info!(session = %self.id, "session completed");
        Ok(())
    }

    /// Calls that have not yet received a `ToolOutput` or `ToolError`.
    pub fn pending_calls(&self) -> Vec<CallId> {
        self.history
            .iter()
            .filter_map(|entry| match entry {
                HistoryEntry::ToolCall { call_id, .. } => Some(*call_id),
                _ => None,
            })
            .filter(|call_id| {
                !self
                    .history
                    .iter()
                    .any(|entry| entry.is_terminal() && entry.call_id() == Some(*call_id))
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn force_entry(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: SessionState) {
        self.state = state;
    }
}

impl Default for SimulationSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::FieldSchema;
    use crate::tools::{tool_fn, ToolDescriptor};

    fn catalog() -> ToolCatalog {
        ToolCatalog::new().with_tool(tool_fn(
            ToolDescriptor::new("add", FieldSchema::object()),
            |_| async move { Ok(json!(4)) },
        ))
    }

    fn active_session() -> SimulationSession {
        let mut session = SimulationSession::new();
        session.select_agent("calculator_agent", catalog()).unwrap();
        session.submit_query("2+2?").unwrap();
        session
    }

    #[test]
    fn new_sessions_start_selecting_an_agent() {
        let session = SimulationSession::new();
        assert_eq!(session.state(), SessionState::SelectingAgent);
        assert!(session.history().is_empty());
        assert_ne!(session.id(), SimulationSession::new().id());
    }

    #[test]
    fn full_lifecycle_transitions() {
        let mut session = SimulationSession::new();
        session.select_agent("calculator_agent", catalog()).unwrap();
        assert_eq!(session.state(), SessionState::AwaitingQuery);

        session.submit_query("2+2?").unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert!(matches!(session.history()[0], HistoryEntry::UserQuery { .. }));

        session.submit_final_response("4").unwrap();
        assert_eq!(session.state(), SessionState::Completed);
        assert!(matches!(
            session.history().last(),
            Some(HistoryEntry::FinalResponse { .. })
        ));
    }

    #[test]
    fn transitions_from_the_wrong_state_are_rejected() {
        let mut session = SimulationSession::new();
        assert!(matches!(
            session.submit_query("hi"),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.submit_final_response("bye"),
            Err(SessionError::InvalidTransition { .. })
        ));

        session.select_agent("calculator_agent", catalog()).unwrap();
        assert!(matches!(
            session.select_agent("another", catalog()),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn tool_calls_resolve_exactly_once() {
        let mut session = active_session();
        let call_id = session
            .begin_tool_call("add", json!({"a": 2, "b": 2}))
            .unwrap();
        assert_eq!(session.pending_calls(), vec![call_id]);

        session
            .resolve_tool_call(
                call_id,
                InvocationOutcome::Success { result: json!(4), duration_ms: 7 },
            )
            .unwrap();
        assert!(session.pending_calls().is_empty());

        let error = session
            .resolve_tool_call(
                call_id,
                InvocationOutcome::Success { result: json!(4), duration_ms: 7 },
            )
            .unwrap_err();
        assert!(matches!(error, SessionError::CallAlreadyResolved(id) if id == call_id));
    }

    #[test]
    fn resolving_an_unknown_call_fails() {
        let mut session = active_session();
        let error = session
            .resolve_tool_call(
                crate::history::new_call_id(),
                InvocationOutcome::Cancelled { duration_ms: 1 },
            )
            .unwrap_err();
        assert!(matches!(error, SessionError::UnknownCall(_)));
    }

    #[test]
    fn unknown_tools_are_rejected_before_recording() {
        let mut session = active_session();
        let error = session.begin_tool_call("missing", json!({})).unwrap_err();
        assert!(matches!(error, SessionError::UnknownTool(name) if name == "missing"));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn final_response_is_blocked_while_calls_are_pending() {
        let mut session = active_session();
        let call_id = session
            .begin_tool_call("add", json!({"a": 2, "b": 2}))
            .unwrap();

        let error = session.submit_final_response("4").unwrap_err();
        assert!(matches!(error, SessionError::PendingInvocation(1)));

        session
            .resolve_tool_call(call_id, InvocationOutcome::Cancelled { duration_ms: 3 })
            .unwrap();
        session.submit_final_response("4").unwrap();
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn cancelled_outcomes_record_a_tool_error() {
        let mut session = active_session();
        let call_id = session
            .begin_tool_call("add", json!({"a": 2, "b": 2}))
            .unwrap();
        session
            .resolve_tool_call(call_id, InvocationOutcome::Cancelled { duration_ms: 3 })
            .unwrap();

        match session.history().last() {
            Some(HistoryEntry::ToolError { kind, .. }) => assert_eq!(kind, "Cancelled"),
            other => panic!("unexpected entry: {other:?}"),
        }
    }
}
