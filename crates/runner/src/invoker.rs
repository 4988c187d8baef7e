// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The invoker seam between the orchestrator and the agent process.
//!
//! The orchestrator is generic over [`AgentInvoker`] so tests drive it with
//! the scripted [`FakeAgent`] while production uses
//! [`ProcessRunner`](crate::ProcessRunner).

use crate::contract::ContractStatus;
use crate::error::RunnerError;
use crate::markers::AcMarker;
use async_trait::async_trait;
use fm_core::Task;
use tokio_util::sync::CancellationToken;

/// One agent invocation: the prompt plus the task identity exported to the
/// child's environment.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub task_id: String,
    pub task_name: String,
    pub task_type: String,
    pub task_priority: String,
    pub prompt: String,
    /// Effective model for this run (task override or configured default).
    pub model: Option<String>,
    pub timeout_ms: u64,
}

impl AgentRequest {
    pub fn for_task(task: &Task, prompt: String, model: Option<String>, timeout_ms: u64) -> Self {
        Self {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            task_type: task.task_type.to_string(),
            task_priority: task.priority.map(|p| p.to_string()).unwrap_or_default(),
            prompt,
            model,
            timeout_ms,
        }
    }
}

/// How the agent process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Process exited on its own.
    Exited,
    /// Killed by the runner's own timeout.
    TimedOut,
    /// Killed through the cancellation token (watchdog or shutdown).
    Cancelled,
}

/// Everything the orchestrator learns from one agent run.
#[derive(Debug, Clone)]
pub struct AgentExecution {
    pub status: ContractStatus,
    pub summary: String,
    pub notes: String,
    pub files: Vec<String>,
    pub tests: Option<serde_json::Value>,
    pub stdout: String,
    pub stderr: String,
    /// Markers detected while streaming, in order.
    pub completed_acs: Vec<AcMarker>,
    pub exit_code: Option<i32>,
    pub end: RunEnd,
    /// Whether a terminal contract was located. A missing contract forces
    /// `Blocked` even on a zero exit.
    pub contract_found: bool,
}

impl AgentExecution {
    /// A blocked execution with the given notes and no contract.
    pub fn blocked(notes: impl Into<String>) -> Self {
        Self {
            status: ContractStatus::Blocked,
            summary: String::new(),
            notes: notes.into(),
            files: Vec::new(),
            tests: None,
            stdout: String::new(),
            stderr: String::new(),
            completed_acs: Vec::new(),
            exit_code: None,
            end: RunEnd::Exited,
            contract_found: false,
        }
    }

    /// A successful execution claiming the given summary and files.
    pub fn done(summary: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            status: ContractStatus::Done,
            summary: summary.into(),
            files,
            contract_found: true,
            ..Self::blocked("")
        }
    }
}

/// Callback fired synchronously for each AC marker as it streams in.
pub type MarkerHook<'a> = Box<dyn FnMut(&AcMarker) + Send + 'a>;

/// Something that can execute an agent request to completion.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn run(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
        on_marker: MarkerHook<'_>,
    ) -> Result<AgentExecution, RunnerError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAgent;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// One scripted response for the [`FakeAgent`].
    #[derive(Debug, Clone)]
    pub struct FakeResponse {
        /// Markers fired through the hook before returning.
        pub markers: Vec<AcMarker>,
        pub execution: AgentExecution,
        /// Simulated run time; a cancelled wait returns a cancelled
        /// execution instead of the scripted one.
        pub delay: Duration,
    }

    impl From<AgentExecution> for FakeResponse {
        fn from(execution: AgentExecution) -> Self {
            Self { markers: Vec::new(), execution, delay: Duration::ZERO }
        }
    }

    /// Scripted in-process agent for orchestrator tests.
    #[derive(Default)]
    pub struct FakeAgent {
        responses: Mutex<VecDeque<FakeResponse>>,
        /// Every request received, in order.
        pub requests: Mutex<Vec<AgentRequest>>,
    }

    impl FakeAgent {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, response: impl Into<FakeResponse>) {
            self.responses.lock().push_back(response.into());
        }

        pub fn push_with_markers(&self, markers: Vec<AcMarker>, execution: AgentExecution) {
            self.responses.lock().push_back(FakeResponse {
                markers,
                execution,
                delay: Duration::ZERO,
            });
        }

        pub fn push_slow(&self, delay: Duration, execution: AgentExecution) {
            self.responses.lock().push_back(FakeResponse { markers: Vec::new(), execution, delay });
        }

        /// Number of runs performed so far.
        pub fn run_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl AgentInvoker for FakeAgent {
        async fn run(
            &self,
            request: AgentRequest,
            cancel: CancellationToken,
            mut on_marker: MarkerHook<'_>,
        ) -> Result<AgentExecution, RunnerError> {
            self.requests.lock().push(request);
            let response = self.responses.lock().pop_front();
            let Some(response) = response else {
                return Ok(AgentExecution::blocked("fake agent script exhausted"));
            };

            for marker in &response.markers {
                on_marker(marker);
            }

            if !response.delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(response.delay) => {}
                    _ = cancel.cancelled() => {
                        let mut cancelled = AgentExecution::blocked("agent run cancelled");
                        cancelled.end = RunEnd::Cancelled;
                        return Ok(cancelled);
                    }
                }
            }

            let mut execution = response.execution;
            execution.completed_acs = response.markers;
            Ok(execution)
        }
    }
}

#[cfg(test)]
#[path = "invoker_tests.rs"]
mod tests;
