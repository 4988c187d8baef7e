// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile passes: pick work, run it, keep going until the queue drains
//! or a failure stops the pass.

use super::{Orchestrator, RunMode, TaskOutcome};
use crate::error::DaemonError;
use fm_core::selector::{
    all_epic_children_done, epic_children, has_incomplete_epic, is_epic, pick_next_epic,
    pick_next_epic_child, pick_next_task,
};
use fm_core::{Clock, Task, TaskStatus};
use fm_runner::AgentInvoker;
use std::sync::Arc;
use tracing::{info, warn};

impl<A, C> Orchestrator<A, C>
where
    A: AgentInvoker + 'static,
    C: Clock + 'static,
{
    pub(crate) async fn reconcile(self: &Arc<Self>, mode: RunMode) -> Result<(), DaemonError> {
        match mode {
            RunMode::Task => self.reconcile_standalone(1).await,
            RunMode::Epic => self.reconcile_epics().await,
            RunMode::Normal => {
                let tasks = self.board.list_tasks()?;
                if has_incomplete_epic(&tasks) {
                    self.reconcile_epics().await
                } else {
                    self.reconcile_standalone(self.config.queue.max_tasks_per_run).await
                }
            }
        }
    }

    /// Run standalone tasks until the queue drains, the per-pass budget is
    /// spent, or a failure breaks the loop.
    async fn reconcile_standalone(self: &Arc<Self>, budget: usize) -> Result<(), DaemonError> {
        for _ in 0..budget {
            let tasks = self.board.list_tasks()?;
            let Some(task) = pick_next_task(&tasks, self.config.queue.order).cloned() else {
                break;
            };

            if self.try_commit_unpersisted(&task)? {
                continue;
            }

            match self.execute_task(&task).await? {
                TaskOutcome::Completed | TaskOutcome::Recovered => continue,
                TaskOutcome::Failed { halt } => {
                    if halt {
                        self.set_halted();
                    }
                    break;
                }
            }
        }
        self.close_finished_epics().await
    }

    /// Epic mode: one epic at a time, its children in order.
    async fn reconcile_epics(self: &Arc<Self>) -> Result<(), DaemonError> {
        let tasks = self.board.list_tasks()?;
        let Some(epic) = pick_next_epic(&tasks, self.config.queue.order).cloned() else {
            // Nothing runnable, but an epic may still be waiting to close
            return self.close_finished_epics().await;
        };

        if epic.status.is_not_started() {
            self.start_epic(&epic, &tasks)?;
        }

        for _ in 0..self.config.queue.max_tasks_per_run {
            let tasks = self.board.list_tasks()?;
            let Some(child) =
                pick_next_epic_child(&tasks, &epic.id, self.config.queue.order).cloned()
            else {
                break;
            };

            if self.try_commit_unpersisted(&child)? {
                continue;
            }

            match self.execute_task(&child).await? {
                TaskOutcome::Completed | TaskOutcome::Recovered => continue,
                TaskOutcome::Failed { halt } => {
                    if halt {
                        self.set_halted();
                    }
                    break;
                }
            }
        }
        self.close_finished_epics().await
    }

    /// Move a fresh epic to In Progress and initialize its children: first
    /// in order becomes In Progress, the rest Not Started.
    fn start_epic(&self, epic: &Task, tasks: &[Task]) -> Result<(), DaemonError> {
        info!(epic = %epic.id, "starting epic");
        self.board.update_task_status(&epic.id, &TaskStatus::InProgress)?;

        let children = epic_children(tasks, &epic.id, self.config.queue.order);
        for (position, child) in children.iter().enumerate() {
            let status =
                if position == 0 { TaskStatus::InProgress } else { TaskStatus::NotStarted };
            if child.status != status {
                self.board.update_task_status(&child.id, &status)?;
            }
        }
        Ok(())
    }

    /// Handle a task whose agent already finished but whose `Done` write
    /// failed: retry the write instead of re-running the agent. Returns
    /// true when the task was handled here.
    fn try_commit_unpersisted(&self, task: &Task) -> Result<bool, DaemonError> {
        if !self.is_completed_unpersisted(&task.id) {
            return Ok(false);
        }
        info!(task = %task.id, "retrying unpersisted done status");
        match self.board.update_task_status(&task.id, &TaskStatus::Done) {
            Ok(()) => {
                self.clear_completed_unpersisted(&task.id);
                self.store.mark_done(&task.id, self.clock.epoch_ms(), Default::default())?;
                self.failures.record_success(&task.id);
                Ok(true)
            }
            Err(e) => {
                warn!(task = %task.id, error = %e, "done status retry failed");
                if self.failures.record_failure(&task.id, &task.name) {
                    self.set_halted();
                }
                Err(e.into())
            }
        }
    }

    /// Close every epic whose children are all done, appending the run
    /// summary (and passing the optional epic review first).
    pub(crate) async fn close_finished_epics(self: &Arc<Self>) -> Result<(), DaemonError> {
        let tasks = self.board.list_tasks()?;
        let open_epics: Vec<Task> = tasks
            .iter()
            .filter(|t| is_epic(t, &tasks) && !t.status.is_done())
            .cloned()
            .collect();

        for epic in open_epics {
            let (all_done, children) = all_epic_children_done(&epic, &tasks);
            if !all_done {
                continue;
            }

            if self.config.review.review_epics && !self.run_epic_review(&epic).await? {
                warn!(epic = %epic.id, "epic review blocked; leaving epic open");
                continue;
            }

            let child_ids: Vec<String> = children.iter().map(|c| c.id.clone()).collect();
            let summary = self.store.epic_summary(&child_ids)?;
            self.board.append_markdown(&epic.id, &summary.to_markdown())?;
            self.board.update_task_status(&epic.id, &TaskStatus::Done)?;
            info!(epic = %epic.id, children = children.len(), "epic closed");
        }
        Ok(())
    }
}
