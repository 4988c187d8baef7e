// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-task execution history.
//!
//! One JSON document keyed by task id. Every mutation is read-modify-write
//! with a `.tmp` write and an atomic rename, so a crash mid-save leaves the
//! previous store intact and concurrent readers see either the old or the
//! new complete file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("run store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Done,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => f.write_str("running"),
            RunStatus::Done => f.write_str("done"),
            RunStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Result blob captured from a successful execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<serde_json::Value>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// One task's execution history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDoc {
    #[serde(default)]
    tasks: HashMap<String, ExecutionRecord>,
}

/// Per-child row of an epic summary.
#[derive(Debug, Clone)]
pub struct EpicSummaryRow {
    pub task_id: String,
    pub status: RunStatus,
    pub duration_ms: Option<u64>,
}

/// Aggregate appended to an epic file when it closes.
#[derive(Debug, Clone, Default)]
pub struct EpicSummary {
    pub rows: Vec<EpicSummaryRow>,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub total_duration_ms: u64,
}

impl EpicSummary {
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("## Epic summary\n\n| Task | Status | Duration |\n|---|---|---|\n");
        for row in &self.rows {
            let duration = row
                .duration_ms
                .map(fm_core::format_elapsed_ms)
                .unwrap_or_else(|| "—".to_string());
            md.push_str(&format!("| {} | {} | {} |\n", row.task_id, row.status, duration));
        }
        md.push_str(&format!(
            "\nTotal execution time: {}\n",
            fm_core::format_elapsed_ms(self.total_duration_ms)
        ));
        if let (Some(earliest), Some(latest)) = (self.earliest, self.latest) {
            md.push_str(&format!(
                "Window: {} → {}\n",
                earliest.to_rfc3339(),
                latest.to_rfc3339()
            ));
        }
        md
    }
}

fn timestamp(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_default()
}

/// Handle to the run-store document.
pub struct RunStore {
    path: PathBuf,
}

impl RunStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load(&self) -> Result<StoreDoc, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDoc::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, doc: &StoreDoc) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = PathBuf::from(format!("{}.tmp", self.path.display()));
        fs::write(&tmp, serde_json::to_string_pretty(doc)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Record a run start. An existing `started_at` is preserved so a
    /// re-attempt keeps the original start of the overall effort.
    pub fn mark_started(&self, task_id: &str, now_ms: u64) -> Result<(), StoreError> {
        let mut doc = self.load()?;
        let now = timestamp(now_ms);
        doc.tasks
            .entry(task_id.to_string())
            .and_modify(|record| {
                record.status = RunStatus::Running;
            })
            .or_insert(ExecutionRecord {
                status: RunStatus::Running,
                started_at: now,
                completed_at: None,
                failed_at: None,
                duration_ms: None,
                result: None,
                error: None,
            });
        self.save(&doc)
    }

    pub fn mark_done(&self, task_id: &str, now_ms: u64, result: RunResult) -> Result<(), StoreError> {
        let mut doc = self.load()?;
        let now = timestamp(now_ms);
        let record = doc.tasks.entry(task_id.to_string()).or_insert(ExecutionRecord {
            status: RunStatus::Running,
            started_at: now,
            completed_at: None,
            failed_at: None,
            duration_ms: None,
            result: None,
            error: None,
        });
        record.status = RunStatus::Done;
        record.completed_at = Some(now);
        record.duration_ms =
            Some((now_ms as i64 - record.started_at.timestamp_millis()).max(0) as u64);
        record.result = Some(result);
        record.error = None;
        self.save(&doc)
    }

    pub fn mark_failed(&self, task_id: &str, now_ms: u64, error: &str) -> Result<(), StoreError> {
        let mut doc = self.load()?;
        let now = timestamp(now_ms);
        let record = doc.tasks.entry(task_id.to_string()).or_insert(ExecutionRecord {
            status: RunStatus::Running,
            started_at: now,
            completed_at: None,
            failed_at: None,
            duration_ms: None,
            result: None,
            error: None,
        });
        record.status = RunStatus::Failed;
        record.failed_at = Some(now);
        record.error = Some(error.to_string());
        self.save(&doc)
    }

    pub fn get(&self, task_id: &str) -> Result<Option<ExecutionRecord>, StoreError> {
        Ok(self.load()?.tasks.remove(task_id))
    }

    /// Aggregate child records for the summary appended to a closing epic.
    pub fn epic_summary(&self, children: &[String]) -> Result<EpicSummary, StoreError> {
        let doc = self.load()?;
        let mut summary = EpicSummary::default();
        for id in children {
            let Some(record) = doc.tasks.get(id) else { continue };
            summary.rows.push(EpicSummaryRow {
                task_id: id.clone(),
                status: record.status,
                duration_ms: record.duration_ms,
            });
            summary.total_duration_ms += record.duration_ms.unwrap_or(0);
            let start = record.started_at;
            summary.earliest =
                Some(summary.earliest.map_or(start, |earliest| earliest.min(start)));
            if let Some(finish) = record.completed_at.or(record.failed_at) {
                summary.latest = Some(summary.latest.map_or(finish, |latest| latest.max(finish)));
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "runstore_tests.rs"]
mod tests;
