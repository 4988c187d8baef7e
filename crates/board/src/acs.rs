// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acceptance-criteria scanner.
//!
//! Every `- [ ]` / `- [x]` line in a task body is an acceptance criterion,
//! numbered 1-based in document order. Numbering is positional: it stays
//! stable only because nothing in this system ever reorders those lines.

use regex::Regex;
use std::sync::LazyLock;

/// Regex pattern for `- [ ]` / `- [x]` checkbox lines
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static CHECKBOX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-\s*\[([ xX])\]\s+(.+)$").expect("constant regex pattern is valid")
});

/// One checkbox line from a task body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceCriterion {
    /// 1-based position among all checkbox lines.
    pub index: usize,
    pub text: String,
    pub checked: bool,
}

/// Scan a body for checkbox lines, in order of appearance.
pub fn parse_acs(body: &str) -> Vec<AcceptanceCriterion> {
    let mut acs = Vec::new();
    for line in body.lines() {
        if let Some(caps) = CHECKBOX_PATTERN.captures(line) {
            let mark = &caps[1];
            acs.push(AcceptanceCriterion {
                index: acs.len() + 1,
                text: caps[2].trim_end().to_string(),
                checked: mark.eq_ignore_ascii_case("x"),
            });
        }
    }
    acs
}

/// Flip the checkbox mark of a matching line to checked.
///
/// Returns the rewritten line, or `None` when the line is not an unchecked
/// checkbox. Used by the board client's line-by-line rewriters.
pub(crate) fn check_line(line: &str) -> Option<String> {
    let caps = CHECKBOX_PATTERN.captures(line)?;
    let mark = caps.get(1)?;
    if mark.as_str() != " " {
        return None;
    }
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..mark.start()]);
    out.push('x');
    out.push_str(&line[mark.end()..]);
    Some(out)
}

/// Parse a single line as a checkbox, without positional numbering.
pub(crate) fn parse_line(line: &str) -> Option<(String, bool)> {
    let caps = CHECKBOX_PATTERN.captures(line)?;
    Some((caps[2].trim_end().to_string(), caps[1].eq_ignore_ascii_case("x")))
}

#[cfg(test)]
#[path = "acs_tests.rs"]
mod tests;
