use std::sync::Mutex;
use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ErrorDescriptor;
use crate::tools::SimTool;

/// Settled result of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Success { result: Value, duration_ms: u64 },
    Failure { error: ErrorDescriptor, duration_ms: u64 },
    Cancelled { duration_ms: u64 },
}

impl InvocationOutcome {
    pub fn duration_ms(&self) -> u64 {
        match self {
            Self::Success { duration_ms, .. }
            | Self::Failure { duration_ms, .. }
            | Self::Cancelled { duration_ms } => *duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Timed, cancellable executor for a single in-flight tool invocation.
///
/// Cancellation is advisory to the callable but authoritative here: once the
/// token fires, the call's future is dropped and its outcome is fixed as
/// `Cancelled`; a late result never surfaces. Failures from the callable are
/// normalized into an [`ErrorDescriptor`], never propagated.
#[derive(Default)]
pub struct ToolRunner {
    in_flight: Mutex<Option<Instant>>,
}

impl ToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an invocation is currently executing.
    pub fn is_running(&self) -> bool {
        self.in_flight.lock().unwrap().is_some()
    }

    /// Milliseconds since the current invocation started (0 when idle).
    pub fn elapsed_ms(&self) -> u64 {
        self.in_flight
            .lock()
            .unwrap()
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    pub async fn invoke(
        &self,
        tool: &dyn SimTool,
        arguments: &Value,
        token: &CancellationToken,
    ) -> InvocationOutcome {
        let name = tool.descriptor().name;
        let started = Instant::now();
        *self.in_flight.lock().unwrap() = Some(started);
        debug!(tool = %name, "invoking tool");

        let outcome = tokio::select! {
            _ = token.cancelled() => {
                let duration_ms = started.elapsed().as_millis() as u64;
                warn!(tool = %name, duration_ms, "tool invocation cancelled");
                InvocationOutcome::Cancelled { duration_ms }
            }
            result = tool.invoke(arguments) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                match result {
                    Ok(result) => {
                        debug!(tool = %name, duration_ms, "tool invocation succeeded");
                        InvocationOutcome::Success { result, duration_ms }
                    }
                    Err(failure) => {
                        let error = ErrorDescriptor::from(&failure);
                        warn!(tool = %name, kind = %error.kind, duration_ms, "tool invocation failed");
                        InvocationOutcome::Failure { error, duration_ms }
                    }
                }
            }
        };

        *self.in_flight.lock().unwrap() = None;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::sleep;

    use super::*;
    use crate::error::{ToolFailure, CANCELLED_KIND};
    use crate::schema::FieldSchema;
    use crate::tools::{tool_fn, ToolDescriptor};

    fn slow_tool(delay: Duration) -> crate::tools::DynSimTool {
        tool_fn(
            ToolDescriptor::new("slow", FieldSchema::object()),
            move |_| async move {
                sleep(delay).await;
                Ok(json!("done"))
            },
        )
    }

    #[tokio::test]
    async fn success_returns_result_unchanged() {
        let tool = tool_fn(
            ToolDescriptor::new("add", FieldSchema::object()),
            |arguments| async move {
                let a = arguments["a"].as_i64().unwrap_or(0);
                let b = arguments["b"].as_i64().unwrap_or(0);
                Ok(json!(a + b))
            },
        );

        let runner = ToolRunner::new();
        let token = CancellationToken::new();
        let outcome = runner
            .invoke(tool.as_ref(), &json!({"a": 2, "b": 2}), &token)
            .await;

        match outcome {
            InvocationOutcome::Success { result, .. } => assert_eq!(result, json!(4)),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn failure_is_normalized_not_propagated() {
        let tool = tool_fn(
            ToolDescriptor::new("bad", FieldSchema::object()),
            |_| async move { Err(ToolFailure::raised("ValueError", "bad input")) },
        );

        let runner = ToolRunner::new();
        let token = CancellationToken::new();
        let outcome = runner.invoke(tool.as_ref(), &json!({}), &token).await;

        match outcome {
            InvocationOutcome::Failure { error, .. } => {
                assert_eq!(error.kind, "ValueError");
                assert_eq!(error.message, "bad input");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_wins_over_a_late_result() {
        let tool = slow_tool(Duration::from_secs(5));
        let runner = ToolRunner::new();
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let outcome = runner.invoke(tool.as_ref(), &json!({}), &token).await;
        assert!(matches!(outcome, InvocationOutcome::Cancelled { .. }));
        assert!(outcome.duration_ms() < 5_000);

        let descriptor = ErrorDescriptor::cancelled();
        assert_eq!(descriptor.kind, CANCELLED_KIND);
    }

    #[tokio::test]
    async fn elapsed_is_zero_when_idle() {
        let runner = ToolRunner::new();
        assert!(!runner.is_running());
        assert_eq!(runner.elapsed_ms(), 0);
    }
}
