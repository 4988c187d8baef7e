// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator tests, driven by the scripted FakeAgent over a tempdir
//! board.

mod auto_recovery;
mod epics;
mod execute;
mod halt;
mod schedule;

use super::*;
use fm_core::SystemClock;
use fm_runner::{AgentExecution, FakeAgent};
use tempfile::TempDir;

pub(crate) struct Harness {
    pub dir: TempDir,
    pub orch: Arc<Orchestrator<FakeAgent, SystemClock>>,
}

/// Board + workdir + orchestrator with fast test timings. Recovery is off
/// unless a test opts in.
pub(crate) fn harness(mutate: impl FnOnce(&mut Config)) -> Harness {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("board")).unwrap();
    std::fs::create_dir_all(dir.path().join("work")).unwrap();

    let mut config = Config::default();
    config.board.root = dir.path().join("board");
    config.agent.workdir = Some(dir.path().join("work"));
    config.queue.debounce_ms = 10;
    config.recovery.enabled = false;
    config.run_store_path = Some(dir.path().join("runs.json"));
    mutate(&mut config);

    let board = fm_board::BoardClient::new(config.board.clone());
    let orch = Orchestrator::new(config, board, FakeAgent::new(), SystemClock);
    Harness { dir, orch }
}

impl Harness {
    pub fn write_task(&self, rel: &str, content: &str) {
        let path = self.dir.path().join("board").join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read_task(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join("board").join(rel)).unwrap()
    }

    /// A done execution whose declared artifact really exists in the
    /// workdir, so the hallucination gate passes.
    pub fn done_with_artifact(&self, summary: &str) -> AgentExecution {
        std::fs::write(self.dir.path().join("work").join("artifact.txt"), summary).unwrap();
        AgentExecution::done(summary, vec!["artifact.txt".to_string()])
    }

    pub fn record(&self, task_id: &str) -> Option<crate::runstore::ExecutionRecord> {
        self.orch.store.get(task_id).unwrap()
    }
}

pub(crate) const SIMPLE_TASK: &str =
    "---\nname: Login\npriority: P1\ntype: UserStory\nstatus: Not Started\n---\n\nBuild it.\n";

pub(crate) const TASK_WITH_ACS: &str = "---\nname: Login\npriority: P1\ntype: UserStory\nstatus: Not Started\n---\n\n- [ ] render form\n- [ ] add route\n";
