// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal contract detection.
//!
//! The agent's authoritative completion signal is a JSON object with a
//! `status` key, emitted anywhere in its output — usually last, often
//! surrounded by prose. Detection is a string-aware brace balancer rather
//! than a regex: every balanced `{…}` span that parses and carries a
//! top-level `status` is a candidate, and the last one wins (outermost on
//! ties).

use serde::{Deserialize, Serialize};

/// Agent-declared outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Done,
    Blocked,
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractStatus::Done => f.write_str("done"),
            ContractStatus::Blocked => f.write_str("blocked"),
        }
    }
}

/// The terminal JSON object emitted by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub status: ContractStatus,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub files: Vec<String>,
    /// Loosely typed: agents emit strings, booleans, or objects here.
    #[serde(default)]
    pub tests: Option<serde_json::Value>,
}

/// Extract the balanced object starting at `start` (which must index a
/// `{`), honoring JSON string and escape rules. Returns the span slice.
fn balanced_object(s: &str, start: usize) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the last parseable JSON object in `output` with a top-level
/// `status` key. Ties on the end position resolve to the outermost span.
pub fn last_status_object(output: &str) -> Option<serde_json::Value> {
    let mut best: Option<(usize, usize, serde_json::Value)> = None;
    for (start, _) in output.match_indices('{') {
        let Some(span) = balanced_object(output, start) else { continue };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(span) else { continue };
        if !value.as_object().is_some_and(|obj| obj.contains_key("status")) {
            continue;
        }
        let end = start + span.len();
        let better = match &best {
            None => true,
            Some((best_start, best_end, _)) => {
                end > *best_end || (end == *best_end && start < *best_start)
            }
        };
        if better {
            best = Some((start, end, value));
        }
    }
    best.map(|(_, _, value)| value)
}

/// Locate and decode the terminal contract. `None` when the output holds
/// no recognizable contract — the caller treats that as blocked.
pub fn find_contract(output: &str) -> Option<Contract> {
    serde_json::from_value(last_status_object(output)?).ok()
}

#[cfg(test)]
#[path = "contract_tests.rs"]
mod tests;
