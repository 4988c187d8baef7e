// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task entity and its enumerated attributes.
//!
//! A task is one markdown file on the board. Its id derives from the file
//! location (`slug` for a top-level file, `epic/slug` for an epic child,
//! the folder name for the epic itself) and never changes while the file
//! stays put.

use crate::config::StatusLabels;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of a task, stored as a frontmatter field.
///
/// Canonical on-disk labels are exact strings (spacing and capitalization
/// preserved); anything unrecognized is carried through as `Other` so the
/// selector can refuse to leapfrog it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Done,
    /// A status label this orchestrator does not own (e.g. "Blocked").
    Other(String),
}

impl TaskStatus {
    /// Map an on-disk label to a status using the configured label set.
    pub fn from_label(raw: &str, labels: &StatusLabels) -> Self {
        let raw = raw.trim();
        if raw == labels.not_started {
            TaskStatus::NotStarted
        } else if raw == labels.in_progress {
            TaskStatus::InProgress
        } else if raw == labels.done {
            TaskStatus::Done
        } else {
            TaskStatus::Other(raw.to_string())
        }
    }

    /// The label written back to the frontmatter `status:` field.
    pub fn as_label<'a>(&'a self, labels: &'a StatusLabels) -> &'a str {
        match self {
            TaskStatus::NotStarted => &labels.not_started,
            TaskStatus::InProgress => &labels.in_progress,
            TaskStatus::Done => &labels.done,
            TaskStatus::Other(raw) => raw,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    pub fn is_not_started(&self) -> bool {
        matches!(self, TaskStatus::NotStarted)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::NotStarted => f.write_str("Not Started"),
            TaskStatus::InProgress => f.write_str("In Progress"),
            TaskStatus::Done => f.write_str("Done"),
            TaskStatus::Other(raw) => f.write_str(raw),
        }
    }
}

/// Priority band P0 (highest) through P3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    /// Parse a `P<k>` label. Unknown or empty values map to `None`.
    pub fn parse(raw: &str) -> Option<Priority> {
        match raw.trim() {
            "P0" | "p0" => Some(Priority::P0),
            "P1" | "p1" => Some(Priority::P1),
            "P2" | "p2" => Some(Priority::P2),
            "P3" | "p3" => Some(Priority::P3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank used for ordering: P0 sorts first, absent priority sorts last.
pub fn priority_rank(priority: Option<Priority>) -> u32 {
    match priority {
        Some(Priority::P0) => 0,
        Some(Priority::P1) => 1,
        Some(Priority::P2) => 2,
        Some(Priority::P3) => 3,
        None => u32::MAX,
    }
}

/// Kind of work a task represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    UserStory,
    Bug,
    Chore,
    Epic,
    Other(String),
}

impl TaskType {
    /// Parse a frontmatter `type:` value. `epic_label` is the configured
    /// literal that marks an epic (default `"Epic"`).
    pub fn parse(raw: &str, epic_label: &str) -> Self {
        let raw = raw.trim();
        if raw == epic_label {
            return TaskType::Epic;
        }
        match raw {
            "UserStory" | "User Story" => TaskType::UserStory,
            "Bug" => TaskType::Bug,
            "Chore" => TaskType::Chore,
            other => TaskType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::UserStory => f.write_str("UserStory"),
            TaskType::Bug => f.write_str("Bug"),
            TaskType::Chore => f.write_str("Chore"),
            TaskType::Epic => f.write_str("Epic"),
            TaskType::Other(raw) => f.write_str(raw),
        }
    }
}

/// One unit of work on the board: a standalone task, an epic, or an epic
/// child. Built by the board client from a single frontmatter parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub priority: Option<Priority>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// Epic id when this task lives inside an epic folder.
    pub parent_id: Option<String>,
    /// Per-task agent model override.
    pub model: Option<String>,
    /// Total acceptance-criteria checkbox lines in the body.
    pub ac_total: usize,
    /// Checked acceptance-criteria lines.
    pub ac_done: usize,
    /// Absolute path of the backing markdown file. Not part of the wire
    /// representation.
    #[serde(skip)]
    pub file_path: PathBuf,
}

impl Task {
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
