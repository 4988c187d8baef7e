// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-recovery bookkeeping.
//!
//! After a failure the orchestrator may run the agent once more with a
//! diagnostic prompt. Attempts are capped per task and per epic; a `fixed`
//! verdict earns the task a fresh attempt, anything else surfaces the
//! original failure unchanged.

use fm_core::RecoveryConfig;
use fm_runner::last_status_object;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;

/// Agent's verdict after a recovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Fixed,
    Unfixable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryVerdict {
    pub status: VerdictStatus,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub root_cause: String,
    #[serde(default)]
    pub files_changed: Vec<String>,
    #[serde(default)]
    pub next_steps: String,
}

/// Locate and decode the recovery verdict in the agent's output. Shares
/// the terminal-contract locator; an unparseable verdict is `None`, which
/// callers treat like `unfixable`.
pub fn parse_verdict(output: &str) -> Option<RecoveryVerdict> {
    serde_json::from_value(last_status_object(output)?).ok()
}

pub struct AutoRecovery {
    config: RecoveryConfig,
    task_attempts: Mutex<HashMap<String, u32>>,
    epic_attempts: Mutex<HashMap<String, u32>>,
}

impl AutoRecovery {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            config,
            task_attempts: Mutex::new(HashMap::new()),
            epic_attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn timeout_ms(&self) -> u64 {
        self.config.timeout_ms
    }

    pub fn model(&self) -> Option<&str> {
        self.config.model.as_deref()
    }

    /// Reserve one recovery attempt. Returns false when the task or its
    /// epic has already spent the budget.
    pub fn try_begin(&self, task_id: &str, epic_id: Option<&str>) -> bool {
        if !self.config.enabled {
            return false;
        }
        let mut tasks = self.task_attempts.lock();
        let task_used = tasks.get(task_id).copied().unwrap_or(0);
        if task_used >= self.config.max_retries {
            return false;
        }
        let mut epics = self.epic_attempts.lock();
        if let Some(epic) = epic_id {
            let epic_used = epics.get(epic).copied().unwrap_or(0);
            if epic_used >= self.config.max_retries {
                return false;
            }
            *epics.entry(epic.to_string()).or_insert(0) += 1;
        }
        *tasks.entry(task_id.to_string()).or_insert(0) += 1;
        true
    }

    /// Forget a task's attempts after it eventually succeeds.
    pub fn reset(&self, task_id: &str) {
        self.task_attempts.lock().remove(task_id);
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
