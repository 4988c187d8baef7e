// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration surface.
//!
//! Loaded from a TOML file; every field has a default so a minimal config
//! only names the board root and the agent command.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// On-disk status labels. These are exact strings; the board client writes
/// them back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusLabels {
    pub not_started: String,
    pub in_progress: String,
    pub done: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            not_started: "Not Started".to_string(),
            in_progress: "In Progress".to_string(),
            done: "Done".to_string(),
        }
    }
}

/// Board location and label vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Root directory enumerated by the board client.
    pub root: PathBuf,
    pub labels: StatusLabels,
    /// The `type:` literal that marks an epic.
    pub epic_type: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("Board"),
            labels: StatusLabels::default(),
            epic_type: "Epic".to_string(),
        }
    }
}

/// Queue policy for the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueOrder {
    Alphabetical,
    PriorityThenAlphabetical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Debounce window between a schedule trigger and the reconcile pass.
    pub debounce_ms: u64,
    pub order: QueueOrder,
    /// Schedule a reconcile as soon as the daemon starts.
    pub run_on_startup: bool,
    /// Periodic re-scan interval; 0 disables polling.
    pub poll_interval_ms: u64,
    /// Upper bound on tasks executed in one reconcile pass.
    pub max_tasks_per_run: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            order: QueueOrder::Alphabetical,
            run_on_startup: true,
            poll_interval_ms: 0,
            max_tasks_per_run: 25,
        }
    }
}

/// How the external agent is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent binary or command name.
    pub command: String,
    /// Working directory for agent runs (and the git hallucination check).
    pub workdir: Option<PathBuf>,
    pub timeout_ms: u64,
    /// Pass the agent's skip-permissions flag.
    pub full_access: bool,
    /// Log the full prompt before each run.
    pub log_prompt: bool,
    /// Default model; per-task frontmatter overrides this.
    pub model: Option<String>,
    /// Free-form text appended to every task prompt.
    pub extra_prompt: Option<String>,
    pub require_tests_created: bool,
    pub require_tests_run: bool,
    pub require_commit: bool,
    /// Exported to the agent as AGENT_OAUTH_TOKEN when set.
    pub oauth_token: Option<String>,
    /// Grace period between SIGTERM and SIGKILL.
    pub kill_grace_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            workdir: None,
            timeout_ms: 600_000,
            full_access: false,
            log_prompt: false,
            model: None,
            extra_prompt: None,
            require_tests_created: false,
            require_tests_run: false,
            require_commit: false,
            oauth_token: None,
            kill_grace_ms: 2_000,
        }
    }
}

/// Optional review pass delegated to a stronger model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub review_tasks: bool,
    pub review_epics: bool,
    pub model: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            review_tasks: false,
            review_epics: false,
            model: "opus".to_string(),
        }
    }
}

/// Watchdog and failure-threshold knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub enabled: bool,
    /// Warning interval while a task runs.
    pub interval_ms: u64,
    /// Warnings issued before the run is killed.
    pub max_warnings: u32,
    pub max_consecutive_same_task: u32,
    pub global_max_consecutive: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 60_000,
            max_warnings: 5,
            max_consecutive_same_task: 3,
            global_max_consecutive: 5,
        }
    }
}

/// Bounded diagnose-and-fix retries after a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub timeout_ms: u64,
    /// Model for the recovery run; falls back to the agent default.
    pub model: Option<String>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            timeout_ms: 300_000,
            model: None,
        }
    }
}

/// Full configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub board: BoardConfig,
    pub queue: QueueConfig,
    pub agent: AgentConfig,
    pub review: ReviewConfig,
    pub watchdog: WatchdogConfig,
    pub recovery: RecoveryConfig,
    /// Reset failed tasks back to Not Started instead of leaving them
    /// In Progress.
    pub auto_reset_failed: bool,
    /// Run store document path. Relative paths resolve against the cwd.
    pub run_store_path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
