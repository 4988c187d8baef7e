// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consecutive-failure accounting and the rate-limit tripwire.
//!
//! Two counters decide when the orchestrator halts itself: failures of the
//! same task in a row, and failures across all tasks in a row. Any success
//! clears both — the thresholds exist to stop repeated burning, not to
//! count lifetime failures.

use fm_core::WatchdogConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::warn;

#[derive(Default)]
struct Counters {
    same_task: HashMap<String, u32>,
    global: u32,
}

pub struct FailureTracker {
    max_same_task: u32,
    global_max: u32,
    counters: Mutex<Counters>,
}

impl FailureTracker {
    pub fn new(config: &WatchdogConfig) -> Self {
        Self {
            max_same_task: config.max_consecutive_same_task,
            global_max: config.global_max_consecutive,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Clear both counters after a successful run.
    pub fn record_success(&self, task_id: &str) {
        let mut counters = self.counters.lock();
        counters.same_task.remove(task_id);
        counters.global = 0;
    }

    /// Account one failure. Returns whether a threshold fired and the
    /// orchestrator should halt.
    pub fn record_failure(&self, task_id: &str, task_name: &str) -> bool {
        let mut counters = self.counters.lock();
        let same = counters.same_task.entry(task_id.to_string()).or_insert(0);
        *same += 1;
        let same = *same;
        counters.global += 1;
        let global = counters.global;
        drop(counters);

        warn!(
            task = %task_id,
            name = %task_name,
            consecutive_same_task = same,
            consecutive_global = global,
            "failure recorded"
        );

        if same >= self.max_same_task {
            warn!(task = %task_id, threshold = self.max_same_task, "same-task failure threshold reached");
            return true;
        }
        if global >= self.global_max {
            warn!(threshold = self.global_max, "global failure threshold reached");
            return true;
        }
        false
    }
}

const RATE_LIMIT_FRAGMENTS: &[&str] = &[
    "hit your limit",
    "rate limit",
    "usage limit",
    "quota exceeded",
    "out of credits",
];

/// Whether an agent message matches a known quota/rate-limit pattern.
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_FRAGMENTS.iter().any(|fragment| lower.contains(fragment))
}

#[cfg(test)]
#[path = "failures_tests.rs"]
mod tests;
