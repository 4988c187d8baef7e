// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental AC-completion markers in the agent's stdout.
//!
//! Agents report progress in one of two line formats:
//!
//! - `{"ac_complete": 3}` — a standalone JSON line naming the AC ordinal
//! - `[AC_COMPLETE] exact criterion text`
//!
//! Both collapse into one internal enum; the board client has a write
//! entry point for each addressing mode.

use serde::{Deserialize, Serialize};

/// A detected AC-completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcMarker {
    /// 1-based ordinal over all checkbox lines in the task body.
    Indexed(usize),
    /// Exact text of the criterion line.
    ByText(String),
}

impl std::fmt::Display for AcMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcMarker::Indexed(n) => write!(f, "AC-{n}"),
            AcMarker::ByText(text) => write!(f, "AC {text:?}"),
        }
    }
}

/// Try to read one stdout line as a marker.
///
/// Tolerates surrounding whitespace and extra JSON fields; anything that
/// does not match either format is not a marker.
pub fn detect_marker(line: &str) -> Option<AcMarker> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix("[AC_COMPLETE]") {
        let text = rest.trim();
        if text.is_empty() {
            return None;
        }
        return Some(AcMarker::ByText(text.to_string()));
    }

    if line.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        let n = value.get("ac_complete")?.as_u64()?;
        if n == 0 {
            return None;
        }
        return Some(AcMarker::Indexed(n as usize));
    }

    None
}

#[cfg(test)]
#[path = "markers_tests.rs"]
mod tests;
