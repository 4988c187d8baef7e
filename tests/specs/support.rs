// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scaffolding: a tempdir board, a shell-script agent, and an
//! orchestrator wired to the real subprocess runner.

use fm_board::BoardClient;
use fm_core::{Config, SystemClock};
use fm_daemon::Orchestrator;
use fm_runner::ProcessRunner;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct Env {
    pub dir: TempDir,
    pub orch: Arc<Orchestrator<ProcessRunner, SystemClock>>,
}

/// Build an environment whose agent is a `/bin/sh` script with the given
/// body. The script runs with the workdir as cwd, the prompt on stdin, and
/// the task identity in `PM_TASK_*`.
pub fn env_with_agent(script_body: &str, mutate: impl FnOnce(&mut Config)) -> Env {
    let dir = TempDir::new().expect("tempdir");
    let board_root = dir.path().join("Board");
    let workdir = dir.path().join("work");
    std::fs::create_dir_all(&board_root).expect("board dir");
    std::fs::create_dir_all(&workdir).expect("workdir");

    let script = dir.path().join("agent.sh");
    std::fs::write(&script, format!("#!/bin/sh\n{script_body}\n")).expect("script");
    let mut perms = std::fs::metadata(&script).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).expect("chmod");

    let mut config = Config::default();
    config.board.root = board_root;
    config.agent.command = script.to_string_lossy().into_owned();
    config.agent.workdir = Some(workdir);
    config.agent.timeout_ms = 15_000;
    config.queue.debounce_ms = 10;
    config.recovery.enabled = false;
    config.run_store_path = Some(dir.path().join("runs.json"));
    mutate(&mut config);

    let board = BoardClient::new(config.board.clone());
    let agent = ProcessRunner::new(config.agent.clone());
    let orch = Orchestrator::new(config, board, agent, SystemClock);
    Env { dir, orch }
}

impl Env {
    pub fn write_task(&self, rel: &str, content: &str) {
        let path = self.dir.path().join("Board").join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("task dir");
        }
        std::fs::write(path, content).expect("task file");
    }

    pub fn read_task(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join("Board").join(rel)).expect("task file")
    }

    /// The run-store document, as written to disk.
    pub fn store_doc(&self) -> serde_json::Value {
        let raw = std::fs::read_to_string(self.dir.path().join("runs.json")).expect("run store");
        serde_json::from_str(&raw).expect("run store json")
    }

    /// Lines of `run-order.log` in the workdir (scripts append task ids).
    pub fn run_order(&self) -> Vec<String> {
        match std::fs::read_to_string(self.workdir().join("run-order.log")) {
            Ok(raw) => raw.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn workdir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Trigger and drain one scheduling cycle.
    pub async fn run(&self) {
        self.orch.schedule("manual", fm_daemon::RunMode::Normal);
        self.orch.run_queued().await;
    }
}
