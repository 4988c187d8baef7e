// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working-tree snapshot for the hallucination gate.
//!
//! An agent that reports `done` must leave some trace: a dirty working
//! tree, a moved HEAD, or at least one of the files it declared. The git
//! probes are deliberately lax — any dirt counts, staged or not — so
//! additive-but-uncommitted work passes.

use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitState {
    pub head: Option<String>,
    pub dirty: bool,
}

impl GitState {
    /// Probe HEAD and dirtiness in `dir`. A directory that is not a git
    /// repository probes as no-head and clean, which disables the git half
    /// of the gate.
    pub async fn capture(dir: &Path) -> GitState {
        let head = run_git(dir, &["rev-parse", "HEAD"]).await;
        let status = run_git(dir, &["status", "--porcelain"]).await;
        GitState {
            head,
            dirty: status.is_some_and(|out| !out.is_empty()),
        }
    }

    /// Whether anything moved since `before`: new dirt or a different HEAD.
    pub fn changed_since(&self, before: &GitState) -> bool {
        self.dirty || self.head != before.head
    }
}

async fn run_git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).current_dir(dir).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether any declared file resolves on disk, relative to `workdir` (or
/// absolute).
pub fn any_declared_file_exists(workdir: &Path, files: &[String]) -> bool {
    files.iter().any(|f| {
        let path = Path::new(f);
        if path.is_absolute() {
            path.exists()
        } else {
            workdir.join(path).exists()
        }
    })
}

#[cfg(test)]
#[path = "gitcheck_tests.rs"]
mod tests;
