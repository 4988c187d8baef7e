// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess implementation of [`AgentInvoker`].
//!
//! Spawns the configured agent command once per run, feeds the prompt on
//! stdin, and streams stdout line by line for markers while the stderr
//! stream is mirrored into the logs. Timeout and cancellation both
//! escalate SIGTERM → grace → SIGKILL.

use crate::contract::find_contract;
use crate::error::RunnerError;
use crate::invoker::{AgentExecution, AgentInvoker, AgentRequest, MarkerHook, RunEnd};
use crate::markers::detect_marker;
use async_trait::async_trait;
use fm_core::AgentConfig;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct ProcessRunner {
    config: AgentConfig,
}

impl ProcessRunner {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    fn command(&self, request: &AgentRequest) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.arg("--print");
        if self.config.full_access {
            cmd.arg("--dangerously-skip-permissions");
        }
        if let Some(model) = request.model.as_deref() {
            cmd.args(["--model", model]);
        }
        cmd.env("PM_TASK_ID", &request.task_id)
            .env("PM_TASK_NAME", &request.task_name)
            .env("PM_TASK_TYPE", &request.task_type)
            .env("PM_TASK_PRIORITY", &request.task_priority);
        if let Some(token) = &self.config.oauth_token {
            cmd.env("AGENT_OAUTH_TOKEN", token);
        }
        if let Some(dir) = &self.config.workdir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// SIGTERM, wait out the grace period, then SIGKILL.
    async fn terminate(&self, child: &mut Child) {
        let grace = Duration::from_millis(self.config.kill_grace_ms);
        if let Some(pid) = child.id() {
            let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            if tokio::time::timeout(grace, child.wait()).await.is_ok() {
                return;
            }
            warn!(pid, "agent ignored SIGTERM, sending SIGKILL");
        }
        let _ = child.kill().await;
    }
}

#[async_trait]
impl AgentInvoker for ProcessRunner {
    async fn run(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
        mut on_marker: MarkerHook<'_>,
    ) -> Result<AgentExecution, RunnerError> {
        let mut child = self.command(&request).spawn().map_err(|source| RunnerError::Spawn {
            command: self.config.command.clone(),
            source,
        })?;

        // Feed the prompt and close stdin. A child that exits without
        // reading produces EPIPE here; its missing contract is reported
        // through the normal path below.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(request.prompt.as_bytes()).await {
                debug!(error = %e, "agent stdin closed early");
            }
            drop(stdin);
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("agent stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("agent stderr not captured"))?;
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();

        let mut stdout_buf = String::new();
        let mut stderr_buf = String::new();
        let mut completed = Vec::new();
        let mut end = RunEnd::Exited;

        let timeout = tokio::time::sleep(Duration::from_millis(request.timeout_ms));
        tokio::pin!(timeout);

        let mut stdout_open = true;
        let mut stderr_open = true;
        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line? {
                    Some(line) => {
                        if let Some(marker) = detect_marker(&line) {
                            debug!(task = %request.task_id, marker = %marker, "ac marker detected");
                            on_marker(&marker);
                            completed.push(marker);
                        }
                        stdout_buf.push_str(&line);
                        stdout_buf.push('\n');
                    }
                    None => stdout_open = false,
                },
                line = stderr_lines.next_line(), if stderr_open => match line? {
                    Some(line) => {
                        debug!(task = %request.task_id, line = %line, "agent stderr");
                        stderr_buf.push_str(&line);
                        stderr_buf.push('\n');
                    }
                    None => stderr_open = false,
                },
                _ = &mut timeout => {
                    warn!(task = %request.task_id, timeout_ms = request.timeout_ms, "agent run timed out");
                    end = RunEnd::TimedOut;
                    self.terminate(&mut child).await;
                    break;
                }
                _ = cancel.cancelled() => {
                    warn!(task = %request.task_id, "agent run cancelled");
                    end = RunEnd::Cancelled;
                    self.terminate(&mut child).await;
                    break;
                }
            }
        }

        let status = child.wait().await?;
        let exit_code = status.code();

        let (contract, notes_override) = match end {
            RunEnd::Exited => match find_contract(&stdout_buf) {
                Some(contract) => (Some(contract), None),
                None => (
                    None,
                    Some(format!(
                        "no terminal contract in agent output (exit code {exit_code:?})"
                    )),
                ),
            },
            RunEnd::TimedOut => {
                (None, Some(format!("agent timed out after {}ms", request.timeout_ms)))
            }
            RunEnd::Cancelled => (None, Some("agent run cancelled before completion".to_string())),
        };

        Ok(match contract {
            Some(contract) => AgentExecution {
                status: contract.status,
                summary: contract.summary,
                notes: contract.notes,
                files: contract.files,
                tests: contract.tests,
                stdout: stdout_buf,
                stderr: stderr_buf,
                completed_acs: completed,
                exit_code,
                end,
                contract_found: true,
            },
            None => {
                let mut execution = AgentExecution::blocked(notes_override.unwrap_or_default());
                execution.stdout = stdout_buf;
                execution.stderr = stderr_buf;
                execution.completed_acs = completed;
                execution.exit_code = exit_code;
                execution.end = end;
                execution
            }
        })
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
