// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[tokio::test]
async fn burst_of_triggers_coalesces_into_one_pass() {
    let h = harness(|config| config.queue.debounce_ms = 50);
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(h.done_with_artifact("ok"));

    h.orch.schedule("manual", RunMode::Normal);
    h.orch.schedule("poll", RunMode::Normal);
    h.orch.schedule("manual", RunMode::Normal);

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(h.orch.agent().run_count(), 1, "one pass for the whole burst");
    assert!(h.read_task("t1-login.md").contains("status: Done"));
    let status = h.orch.status();
    assert!(!status.active);
    assert!(status.queued_reasons.is_empty());
}

#[tokio::test]
async fn run_queued_is_single_flight() {
    let h = harness(|config| config.queue.debounce_ms = 5_000);
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(h.done_with_artifact("ok"));

    // Mark work pending (the long debounce keeps the spawned sleeper out
    // of the picture), then race two direct drivers.
    h.orch.schedule("manual", RunMode::Normal);
    tokio::join!(h.orch.run_queued(), h.orch.run_queued());

    assert_eq!(h.orch.agent().run_count(), 1);
    assert!(h.read_task("t1-login.md").contains("status: Done"));
}

#[tokio::test]
async fn task_mode_runs_exactly_one_task() {
    let h = harness(|_| {});
    h.write_task("a-one.md", SIMPLE_TASK);
    h.write_task("b-two.md", SIMPLE_TASK);
    h.orch.agent().push(h.done_with_artifact("one"));
    h.orch.agent().push(h.done_with_artifact("two"));

    h.orch.reconcile(RunMode::Task).await.unwrap();

    assert_eq!(h.orch.agent().run_count(), 1);
    assert!(h.read_task("a-one.md").contains("status: Done"));
    assert!(h.read_task("b-two.md").contains("status: Not Started"));
}

#[tokio::test]
async fn max_tasks_per_run_bounds_a_pass() {
    let h = harness(|config| config.queue.max_tasks_per_run = 2);
    h.write_task("a-one.md", SIMPLE_TASK);
    h.write_task("b-two.md", SIMPLE_TASK);
    h.write_task("c-three.md", SIMPLE_TASK);
    for _ in 0..3 {
        h.orch.agent().push(h.done_with_artifact("ok"));
    }

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert_eq!(h.orch.agent().run_count(), 2);
    assert!(h.read_task("c-three.md").contains("status: Not Started"));
}

#[tokio::test]
async fn priority_order_picks_urgent_work_first() {
    let h = harness(|config| {
        config.queue.order = fm_core::QueueOrder::PriorityThenAlphabetical;
    });
    h.write_task("a-low.md", "---\nname: Low\npriority: P3\ntype: Chore\nstatus: Not Started\n---\n");
    h.write_task("z-hot.md", "---\nname: Hot\npriority: P0\ntype: Bug\nstatus: Not Started\n---\n");
    h.orch.agent().push(h.done_with_artifact("hot fixed"));
    h.orch.agent().push(h.done_with_artifact("low done"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    let requests = h.orch.agent().requests.lock();
    assert_eq!(requests[0].task_id, "z-hot");
    assert_eq!(requests[1].task_id, "a-low");
}

#[tokio::test]
async fn trigger_during_a_pass_is_folded_into_the_next_loop() {
    let h = harness(|config| config.queue.debounce_ms = 10);
    h.write_task("a-one.md", SIMPLE_TASK);
    h.orch.agent().push_slow(Duration::from_millis(300), {
        std::fs::write(h.dir.path().join("work").join("artifact.txt"), "x").unwrap();
        AgentExecution::done("slow one", vec!["artifact.txt".to_string()])
    });

    h.orch.schedule("manual", RunMode::Normal);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Pass is mid-run; drop a new task and trigger again
    h.write_task("b-two.md", SIMPLE_TASK);
    h.orch.agent().push(h.done_with_artifact("two"));
    h.orch.schedule("file-change", RunMode::Normal);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert!(h.read_task("a-one.md").contains("status: Done"));
    assert!(h.read_task("b-two.md").contains("status: Done"));
    assert_eq!(h.orch.agent().run_count(), 2);
}
