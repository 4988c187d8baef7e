// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runstore::RunStatus;
use std::time::Duration;

#[tokio::test]
async fn rate_limit_signal_halts_until_resume() {
    let h = harness(|_| {});
    h.write_task("t1-login.md", SIMPLE_TASK);
    let mut execution = AgentExecution::blocked("agent exited");
    execution.stderr = "you've hit your limit (resets in 3h)\n".to_string();
    h.orch.agent().push(execution);

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert!(h.orch.is_halted());
    assert_eq!(h.record("t1-login").unwrap().status, RunStatus::Failed);

    // Triggers are dropped while halted
    h.orch.schedule("manual", RunMode::Normal);
    let status = h.orch.status();
    assert!(status.halted);
    assert!(status.queued_reasons.is_empty());

    assert!(h.orch.resume(), "resume reports the flag was set");
    assert!(!h.orch.is_halted());
    assert!(!h.orch.resume(), "second resume is a no-op");
}

#[tokio::test]
async fn same_task_failure_threshold_halts() {
    let h = harness(|config| config.watchdog.max_consecutive_same_task = 2);
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(AgentExecution::blocked("one"));
    h.orch.agent().push(AgentExecution::blocked("two"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert!(!h.orch.is_halted(), "first failure is under the threshold");

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert!(h.orch.is_halted(), "second consecutive failure halts");
}

#[tokio::test]
async fn global_failure_threshold_spans_tasks() {
    let h = harness(|config| {
        config.watchdog.max_consecutive_same_task = 10;
        config.watchdog.global_max_consecutive = 2;
        config.auto_reset_failed = true;
    });
    h.write_task("a-one.md", SIMPLE_TASK);
    h.write_task("b-two.md", SIMPLE_TASK);
    h.orch.agent().push(AgentExecution::blocked("x"));
    h.orch.agent().push(AgentExecution::blocked("y"));

    // Each pass fails one task; alphabetical order alternates nothing —
    // the first task is auto-reset and re-picked, so two passes hit the
    // global cap.
    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert!(!h.orch.is_halted());
    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert!(h.orch.is_halted());
}

#[tokio::test]
async fn watchdog_kills_a_stuck_run() {
    let h = harness(|config| {
        config.watchdog.interval_ms = 50;
        config.watchdog.max_warnings = 2;
    });
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push_slow(Duration::from_secs(60), AgentExecution::done("never", vec![]));

    let started = std::time::Instant::now();
    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(10), "run was cut short");

    let record = h.record("t1-login").unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.error.unwrap().contains("watchdog"));
}

#[tokio::test]
async fn pause_blocks_scheduling_without_halt_semantics() {
    let h = harness(|_| {});
    h.orch.pause();
    h.orch.schedule("manual", RunMode::Normal);
    assert!(h.orch.status().queued_reasons.is_empty());
    assert!(!h.orch.is_halted());

    h.orch.unpause();
    assert!(!h.orch.status().paused);
}
