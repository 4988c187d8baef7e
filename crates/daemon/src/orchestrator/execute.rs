// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-task execution discipline.
//!
//! Transition order within one execution is fixed: In Progress → agent run
//! → checkboxes → notes → Done → run store. The Done write is the commit
//! point; everything after it must stay idempotent for crash recovery.

use super::Orchestrator;
use crate::error::DaemonError;
use crate::failures::is_rate_limit_message;
use crate::gitcheck::{any_declared_file_exists, GitState};
use crate::recovery::{parse_verdict, RecoveryVerdict, VerdictStatus};
use crate::runstore::RunResult;
use fm_core::selector::epic_children;
use fm_core::{Clock, Task, TaskStatus};
use fm_runner::{
    build_epic_review_prompt, build_recovery_prompt, build_retry_prompt, build_review_prompt,
    build_task_prompt, output_tail, AcMarker, AgentExecution, AgentInvoker, AgentRequest,
    ContractStatus, MarkerHook, PromptOptions, RecoveryContext, RunEnd,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How one task execution ended, from the reconcile loop's point of view.
pub(crate) enum TaskOutcome {
    Completed,
    /// Recovery reported `fixed`; the task went back to Not Started for a
    /// fresh attempt.
    Recovered,
    Failed {
        halt: bool,
    },
}

impl<A, C> Orchestrator<A, C>
where
    A: AgentInvoker + 'static,
    C: Clock + 'static,
{
    pub(crate) async fn execute_task(
        self: &Arc<Self>,
        task: &Task,
    ) -> Result<TaskOutcome, DaemonError> {
        self.set_current_task(Some(task.id.clone()));
        let result = self.execute_task_inner(task).await;
        self.set_current_task(None);
        result
    }

    async fn execute_task_inner(self: &Arc<Self>, task: &Task) -> Result<TaskOutcome, DaemonError> {
        if task.status.is_not_started() {
            self.board.update_task_status(&task.id, &TaskStatus::InProgress)?;
        }
        self.store.mark_started(&task.id, self.clock.epoch_ms())?;
        info!(task = %task.id, name = %task.name, "executing task");

        let markdown = self.board.get_task_markdown(&task.id)?;
        let acs = fm_board::parse_acs(&fm_board::parse(&markdown).body);
        let prompt = build_task_prompt(
            task,
            &markdown,
            &acs,
            &PromptOptions {
                require_tests_created: self.config.agent.require_tests_created,
                require_tests_run: self.config.agent.require_tests_run,
                require_commit: self.config.agent.require_commit,
                extra_prompt: self.config.agent.extra_prompt.as_deref(),
            },
        );
        if self.config.agent.log_prompt {
            info!(task = %task.id, prompt = %prompt, "task prompt");
        }

        let before = GitState::capture(&self.check_dir()).await;
        let mut execution =
            self.run_agent(task, prompt, self.effective_model(task)).await?;

        // Hallucination gate: done with nothing to show earns one
        // corrective retry quoting the claimed contract.
        if execution.status == ContractStatus::Done
            && self.is_hallucinated(&before, &execution).await
        {
            warn!(task = %task.id, "agent reported done with no observable change; retrying once");
            let retry_prompt = build_retry_prompt(task, &execution.summary, &execution.files);
            let retry = self.run_agent(task, retry_prompt, self.effective_model(task)).await?;
            if retry.status == ContractStatus::Done
                && !self.is_hallucinated(&before, &retry).await
            {
                execution = retry;
            } else {
                return self
                    .handle_failure(
                        task,
                        "agent reported done without producing any artifact",
                        Some(&retry),
                    )
                    .await;
            }
        }

        if execution.status != ContractStatus::Done {
            let message = failure_message(&execution);
            return self.handle_failure(task, &message, Some(&execution)).await;
        }

        // Optional review pass on a stronger model
        if self.config.review.review_tasks
            && self.effective_model(task).as_deref() != Some(self.config.review.model.as_str())
        {
            let review_prompt =
                build_review_prompt(task, &self.board.get_task_markdown(&task.id)?);
            info!(task = %task.id, model = %self.config.review.model, "running review pass");
            let review = self
                .run_agent(task, review_prompt, Some(self.config.review.model.clone()))
                .await?;
            if review.status != ContractStatus::Done {
                let reason =
                    if review.notes.is_empty() { &review.summary } else { &review.notes };
                return self
                    .handle_failure(task, &format!("review blocked: {reason}"), Some(&review))
                    .await;
            }
        }

        // Final idempotent checkbox pass over everything the agent reported
        self.apply_markers(&task.id, &execution.completed_acs)?;

        // Verification gate: every declared criterion must be checked now
        let verified = self.board.get_task(&task.id)?;
        if verified.ac_total > 0 && verified.ac_done < verified.ac_total {
            let message = format!(
                "acceptance criteria incomplete: {}/{} checked",
                verified.ac_done, verified.ac_total
            );
            return self.handle_failure(task, &message, Some(&execution)).await;
        }

        self.board.append_markdown(&task.id, &self.completion_note(&execution))?;

        // Commit point. Record the completion first so a failed write is
        // retried on the next reconcile instead of re-running the agent.
        self.note_completed_unpersisted(&task.id);
        if let Err(e) = self.board.update_task_status(&task.id, &TaskStatus::Done) {
            warn!(task = %task.id, error = %e, "done status write failed; will retry next pass");
            return Err(e.into());
        }
        self.clear_completed_unpersisted(&task.id);

        self.store.mark_done(
            &task.id,
            self.clock.epoch_ms(),
            RunResult {
                summary: execution.summary.clone(),
                notes: execution.notes.clone(),
                files: execution.files.clone(),
                tests: execution.tests.clone(),
                stdout: execution.stdout.clone(),
                stderr: execution.stderr.clone(),
            },
        )?;
        self.failures.record_success(&task.id);
        self.recovery.reset(&task.id);
        info!(task = %task.id, "task completed");
        Ok(TaskOutcome::Completed)
    }

    /// Invoke the agent with the watchdog attached and checkbox updates
    /// wired to the marker stream.
    async fn run_agent(
        &self,
        task: &Task,
        prompt: String,
        model: Option<String>,
    ) -> Result<AgentExecution, DaemonError> {
        let request =
            AgentRequest::for_task(task, prompt, model, self.config.agent.timeout_ms);
        let cancel = CancellationToken::new();
        let watchdog = self.watchdog.start(&task.id, cancel.clone());

        let board = self.board.clone();
        let task_id = task.id.clone();
        let hook: MarkerHook<'_> = Box::new(move |marker: &AcMarker| {
            let result = match marker {
                AcMarker::Indexed(n) => board.update_checkboxes_by_index(&task_id, &[*n]),
                AcMarker::ByText(text) => {
                    board.update_checkboxes_by_text(&task_id, std::slice::from_ref(text))
                }
            };
            match result {
                Ok(flipped) if flipped > 0 => {
                    info!(task = %task_id, marker = %marker, "acceptance criterion checked");
                }
                Ok(_) => {
                    warn!(task = %task_id, marker = %marker, "marker matched no unchecked criterion");
                }
                Err(e) => {
                    warn!(task = %task_id, marker = %marker, error = %e, "checkbox update failed");
                }
            }
        });

        let result = self.agent.run(request, cancel, hook).await;
        watchdog.stop();
        Ok(result?)
    }

    /// Task-level model override, then the configured default.
    fn effective_model(&self, task: &Task) -> Option<String> {
        task.model.clone().or_else(|| self.config.agent.model.clone())
    }

    fn check_dir(&self) -> PathBuf {
        self.config.agent.workdir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    async fn is_hallucinated(&self, before: &GitState, execution: &AgentExecution) -> bool {
        let dir = self.check_dir();
        let after = GitState::capture(&dir).await;
        let git_changed = after.changed_since(before);
        let files_exist = any_declared_file_exists(&dir, &execution.files);
        !git_changed && !files_exist
    }

    /// Re-apply every reported marker through the board client.
    fn apply_markers(&self, task_id: &str, markers: &[AcMarker]) -> Result<(), DaemonError> {
        let mut indices = Vec::new();
        let mut texts = Vec::new();
        for marker in markers {
            match marker {
                AcMarker::Indexed(n) => indices.push(*n),
                AcMarker::ByText(text) => texts.push(text.clone()),
            }
        }
        if !indices.is_empty() {
            self.board.update_checkboxes_by_index(task_id, &indices)?;
        }
        if !texts.is_empty() {
            self.board.update_checkboxes_by_text(task_id, &texts)?;
        }
        Ok(())
    }

    /// Account a failed execution: run store, failure note, thresholds,
    /// rate-limit halt, and (maybe) one recovery pass.
    async fn handle_failure(
        self: &Arc<Self>,
        task: &Task,
        message: &str,
        execution: Option<&AgentExecution>,
    ) -> Result<TaskOutcome, DaemonError> {
        warn!(task = %task.id, message, "task failed");
        self.store.mark_failed(&task.id, self.clock.epoch_ms(), message)?;

        if let Err(e) = self.board.append_markdown(&task.id, &self.failure_note(message)) {
            warn!(task = %task.id, error = %e, "could not append failure note");
        }

        let rate_limited = is_rate_limit_message(message)
            || execution.is_some_and(|e| {
                is_rate_limit_message(&e.notes) || is_rate_limit_message(&e.stderr)
            });
        if rate_limited {
            warn!(task = %task.id, "rate-limit signal detected");
            self.set_halted();
            return Ok(TaskOutcome::Failed { halt: true });
        }

        if self.config.auto_reset_failed {
            if let Err(e) = self.board.update_task_status(&task.id, &TaskStatus::NotStarted) {
                warn!(task = %task.id, error = %e, "auto-reset failed");
            }
        }

        if self.failures.record_failure(&task.id, &task.name) {
            return Ok(TaskOutcome::Failed { halt: true });
        }

        if let Some(failed) = execution {
            if self.recovery.try_begin(&task.id, task.parent_id.as_deref()) {
                match self.attempt_recovery(task, message, failed).await? {
                    Some(verdict) if verdict.status == VerdictStatus::Fixed => {
                        info!(
                            task = %task.id,
                            root_cause = %verdict.root_cause,
                            "recovery reports fixed; re-enqueueing task"
                        );
                        self.board.update_task_status(&task.id, &TaskStatus::NotStarted)?;
                        return Ok(TaskOutcome::Recovered);
                    }
                    Some(verdict) => {
                        warn!(task = %task.id, summary = %verdict.summary, "recovery reports unfixable");
                    }
                    None => {
                        warn!(task = %task.id, "recovery produced no verdict");
                    }
                }
            }
        }

        Ok(TaskOutcome::Failed { halt: false })
    }

    /// One diagnose-and-fix run with the recovery prompt.
    async fn attempt_recovery(
        &self,
        task: &Task,
        message: &str,
        failed: &AgentExecution,
    ) -> Result<Option<RecoveryVerdict>, DaemonError> {
        info!(task = %task.id, "attempting auto-recovery");
        let markdown = self.board.get_task_markdown(&task.id)?;
        let acs = fm_board::parse_acs(&fm_board::parse(&markdown).body);
        let dir = self.check_dir();
        let expected_files: Vec<(String, bool)> = failed
            .files
            .iter()
            .map(|f| (f.clone(), any_declared_file_exists(&dir, std::slice::from_ref(f))))
            .collect();

        let prompt = build_recovery_prompt(&RecoveryContext {
            task,
            error: message,
            output_tail: output_tail(&failed.stdout, 3_000),
            acs: &acs,
            expected_files: &expected_files,
        });
        let model = self
            .recovery
            .model()
            .map(str::to_string)
            .or_else(|| self.effective_model(task));
        let request = AgentRequest::for_task(task, prompt, model, self.recovery.timeout_ms());

        let cancel = CancellationToken::new();
        let watchdog = self.watchdog.start(&task.id, cancel.clone());
        let execution = self.agent.run(request, cancel, Box::new(|_| {})).await;
        watchdog.stop();
        Ok(parse_verdict(&execution?.stdout))
    }

    /// Epic-level review; true means the epic may close.
    pub(crate) async fn run_epic_review(self: &Arc<Self>, epic: &Task) -> Result<bool, DaemonError> {
        let tasks = self.board.list_tasks()?;
        let child_ids: Vec<String> = epic_children(&tasks, &epic.id, self.config.queue.order)
            .iter()
            .map(|c| c.id.clone())
            .collect();
        let summary = self.store.epic_summary(&child_ids)?;
        let prompt = build_epic_review_prompt(epic, &summary.to_markdown());
        info!(epic = %epic.id, model = %self.config.review.model, "running epic review");
        let review =
            self.run_agent(epic, prompt, Some(self.config.review.model.clone())).await?;
        Ok(review.status == ContractStatus::Done)
    }

    fn timestamp(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.clock.epoch_ms() as i64)
            .unwrap_or_default()
            .to_rfc3339()
    }

    fn completion_note(&self, execution: &AgentExecution) -> String {
        let mut md = format!("## Completed ({})\n\n", self.timestamp());
        md.push_str(&format!("**Summary:** {}\n", execution.summary));
        if !execution.notes.is_empty() {
            md.push_str(&format!("**Notes:** {}\n", execution.notes));
        }
        if !execution.files.is_empty() {
            md.push_str("**Files:**\n");
            for file in &execution.files {
                md.push_str(&format!("- {file}\n"));
            }
        }
        md
    }

    fn failure_note(&self, message: &str) -> String {
        format!("## Failed ({})\n\n{message}\n", self.timestamp())
    }
}

fn failure_message(execution: &AgentExecution) -> String {
    match execution.end {
        RunEnd::TimedOut => execution.notes.clone(),
        RunEnd::Cancelled => format!("watchdog killed the run: {}", execution.notes),
        RunEnd::Exited => {
            if !execution.contract_found {
                execution.notes.clone()
            } else if execution.notes.is_empty() {
                format!("agent reported blocked: {}", execution.summary)
            } else {
                format!("agent reported blocked: {}", execution.notes)
            }
        }
    }
}
