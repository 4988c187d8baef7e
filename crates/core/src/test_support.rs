// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared across crates via the `test-support` feature.

use crate::task::{Priority, Task, TaskStatus, TaskType};
use std::path::PathBuf;

/// Builder for in-memory tasks in tests. Defaults to a not-started
/// standalone chore.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            task: Task {
                name: id.clone(),
                id,
                priority: None,
                task_type: TaskType::Chore,
                status: TaskStatus::NotStarted,
                parent_id: None,
                model: None,
                ac_total: 0,
                ac_done: 0,
                file_path: PathBuf::new(),
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.task.name = name.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.task.priority = Some(priority);
        self
    }

    pub fn task_type(mut self, task_type: TaskType) -> Self {
        self.task.task_type = task_type;
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn parent(mut self, epic_id: impl Into<String>) -> Self {
        self.task.parent_id = Some(epic_id.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.task.model = Some(model.into());
        self
    }

    pub fn acs(mut self, total: usize, done: usize) -> Self {
        self.task.ac_total = total;
        self.task.ac_done = done;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Shorthand for an epic task.
pub fn epic(id: &str) -> TaskBuilder {
    TaskBuilder::new(id).task_type(TaskType::Epic)
}
