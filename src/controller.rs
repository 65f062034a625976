use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agents::{AgentDirectory, AgentProfile};
use crate::export::{ArtifactStore, ExportError, TraceBuilder};
use crate::form::{self, FieldPath, FormFieldDescriptor, Violation};
use crate::history::CallId;
use crate::runner::ToolRunner;
use crate::session::{SessionError, SimulationSession};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("arguments for tool '{tool}' failed validation: {} violation(s)", .violations.len())]
    Validation {
        tool: String,
        violations: Vec<Violation>,
    },

    #[error("structured content failed validation: {} violation(s)", .0.len())]
    ContentValidation(Vec<Violation>),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Clonable handle for signalling cancellation of the in-flight invocation
/// from outside the owning task (e.g. a UI callback).
#[derive(Clone, Default)]
pub struct CancelHandle {
    inner: Arc<Mutex<Option<CancellationToken>>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if let Some(token) = self.inner.lock().unwrap().as_ref() {
            token.cancel();
        }
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.inner.lock().unwrap() = Some(token.clone());
        token
    }

    fn disarm(&self) {
        *self.inner.lock().unwrap() = None;
    }
}

/// Orchestrates one roleplay run: agent selection, query, tool invocations,
/// final response, export.
///
/// At most one invocation is in flight at a time; the human drives the loop.
pub struct SimulationController {
    agents: AgentDirectory,
    session: SimulationSession,
    runner: ToolRunner,
    cancel: CancelHandle,
}

impl SimulationController {
    pub fn new(agents: AgentDirectory) -> Self {
        Self {
            agents,
            session: SimulationSession::new(),
            runner: ToolRunner::new(),
            cancel: CancelHandle::default(),
        }
    }

    pub fn agents(&self) -> &AgentDirectory {
        &self.agents
    }

    pub fn session(&self) -> &SimulationSession {
        &self.session
    }

    pub fn runner(&self) -> &ToolRunner {
        &self.runner
    }

    /// Discard the current session and start over with a fresh instance.
    pub fn new_session(&mut self) -> &SimulationSession {
        self.session = SimulationSession::new();
        &self.session
    }

    pub fn select_agent(&mut self, name: &str) -> Result<(), ControllerError> {
        let profile = self
            .agents
            .get(name)
            .ok_or_else(|| ControllerError::UnknownAgent(name.to_string()))?;
        let tools = profile.tools().clone();
        let agent_name = profile.name().to_string();
        self.session.select_agent(agent_name, tools)?;
        Ok(())
    }

    fn selected_profile(&self) -> Option<&AgentProfile> {
        self.agents.get(self.session.agent_name())
    }

    pub fn system_instruction(&self) -> Option<&str> {
        self.selected_profile().map(AgentProfile::instruction)
    }

    /// Descriptor tree for a tool's parameter form, regenerated per call.
    pub fn form_for_tool(&self, name: &str) -> Option<FormFieldDescriptor> {
        self.session.tools().get(name).map(|tool| {
            let descriptor = tool.descriptor();
            form::generate(&descriptor.parameters, FieldPath::root())
        })
    }

    pub fn input_form(&self) -> Option<FormFieldDescriptor> {
        self.selected_profile()
            .and_then(AgentProfile::input_schema)
            .map(|schema| form::generate(schema, FieldPath::root()))
    }

    pub fn output_form(&self) -> Option<FormFieldDescriptor> {
        self.selected_profile()
            .and_then(AgentProfile::output_schema)
            .map(|schema| form::generate(schema, FieldPath::root()))
    }

    pub fn submit_query(&mut self, content: impl Into<String>) -> Result<(), ControllerError> {
        self.session.submit_query(content)?;
        Ok(())
    }

    /// Validate a structured query against the agent's input schema, then
    /// record it as JSON text.
    pub fn submit_structured_query(&mut self, values: &Value) -> Result<(), ControllerError> {
        if let Some(schema) = self.selected_profile().and_then(AgentProfile::input_schema) {
            let violations = form::validate(schema, values);
            if !violations.is_empty() {
                return Err(ControllerError::ContentValidation(violations));
            }
        }
        let content = serde_json::to_string(values)?;
        self.submit_query(content)
    }

    /// Invoke a tool and record both the call and its outcome in history.
    ///
    /// Arguments are validated against the tool's declared schema first; on
    /// violations nothing is invoked and nothing is recorded. Invocation
    /// failures and cancellation are recorded as history entries, not errors.
    pub async fn invoke_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<CallId, ControllerError> {
        let tool = self
            .session
            .tools()
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownTool(name.to_string()))?;

        let descriptor = tool.descriptor();
        let violations = form::validate(&descriptor.parameters, &arguments);
        if !violations.is_empty() {
            return Err(ControllerError::Validation {
                tool: name.to_string(),
                violations,
            });
        }

        let call_id = self.session.begin_tool_call(name, arguments.clone())?;
        let token = self.cancel.arm();
        let outcome = self.runner.invoke(tool.as_ref(), &arguments, &token).await;
        self.cancel.disarm();
        self.session.resolve_tool_call(call_id, outcome)?;
        Ok(call_id)
    }

    /// Request cancellation of the in-flight invocation, if any.
    pub fn cancel_invocation(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn submit_final_response(
        &mut self,
        content: impl Into<String>,
    ) -> Result<(), ControllerError> {
        self.session.submit_final_response(content)?;
        Ok(())
    }

    /// Validate a structured response against the agent's output schema, then
    /// record it as JSON text.
    pub fn submit_structured_response(&mut self, values: &Value) -> Result<(), ControllerError> {
        if let Some(schema) = self.selected_profile().and_then(AgentProfile::output_schema) {
            let violations = form::validate(schema, values);
            if !violations.is_empty() {
                return Err(ControllerError::ContentValidation(violations));
            }
        }
        let content = serde_json::to_string(values)?;
        self.submit_final_response(content)
    }

    /// Build the artifact for the completed session and append it to the
    /// collection at `path`. The in-memory session is left untouched, so a
    /// failed export can simply be retried.
    pub fn export_artifact(&self, path: impl AsRef<Path>) -> Result<String, ControllerError> {
        let artifact = TraceBuilder::build(&self.session)?;
        let artifact_id = artifact.artifact_id.clone();
        ArtifactStore::append(path, artifact)?;
        info!(artifact = %artifact_id, "artifact exported");
        Ok(artifact_id)
    }
}
