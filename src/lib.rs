pub mod error;
pub mod schema;
pub mod form;
pub mod history;
pub mod tools;
pub mod runner;
pub mod session;
pub mod agents;
pub mod controller;
pub mod export;
pub mod plugins;

pub use error::{ErrorDescriptor, ToolFailure, CANCELLED_KIND};
pub use schema::{FieldSchema, PrimitiveKind, SchemaError};
pub use form::{FieldPath, FormFieldDescriptor, Violation, WidgetKind};
pub use history::{CallId, HistoryEntry};
pub use tools::{DynSimTool, SimTool, ToolCatalog, ToolDescriptor};
pub use runner::{InvocationOutcome, ToolRunner};
pub use session::{SessionError, SessionState, SimulationSession};
pub use agents::{AgentDirectory, AgentProfile};
pub use controller::{CancelHandle, ControllerError, SimulationController};
pub use export::{
    ArtifactCollection,
    ArtifactStore,
    EvaluationArtifact,
    ExportError,
    ResultPayload,
    ToolInvocation,
    ToolResult,
    TraceBuilder,
};
pub use schemars::JsonSchema;
