// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runstore::RunStatus;

fn verdict_execution(json: &str) -> AgentExecution {
    let mut execution = AgentExecution::blocked("recovery run");
    execution.stdout = json.to_string();
    execution
}

#[tokio::test]
async fn fixed_verdict_earns_a_fresh_attempt() {
    let h = harness(|config| config.recovery.enabled = true);
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(AgentExecution::blocked("cannot find module './auth'"));
    h.orch.agent().push(verdict_execution(
        r#"{"status":"fixed","summary":"restored auth module","root_cause":"bad import"}"#,
    ));
    h.orch.agent().push(h.done_with_artifact("second attempt worked"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert_eq!(h.orch.agent().run_count(), 3, "task, recovery, fresh attempt");
    assert!(h.read_task("t1-login.md").contains("status: Done"));
    assert_eq!(h.record("t1-login").unwrap().status, RunStatus::Done);

    let requests = h.orch.agent().requests.lock();
    assert!(requests[1].prompt.contains("previous attempt"), "recovery prompt");
    assert!(requests[1].prompt.contains("cannot find module"));
}

#[tokio::test]
async fn unfixable_verdict_surfaces_the_original_failure() {
    let h = harness(|config| config.recovery.enabled = true);
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(AgentExecution::blocked("disk on fire"));
    h.orch
        .agent()
        .push(verdict_execution(r#"{"status":"unfixable","summary":"hardware"}"#));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert_eq!(h.orch.agent().run_count(), 2);
    let record = h.record("t1-login").unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.error.unwrap().contains("disk on fire"));
    assert!(h.read_task("t1-login.md").contains("status: In Progress"));
}

#[tokio::test]
async fn garbled_verdict_counts_as_unfixable() {
    let h = harness(|config| config.recovery.enabled = true);
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(AgentExecution::blocked("boom"));
    h.orch.agent().push(verdict_execution("I tried some things, no JSON though"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert_eq!(h.record("t1-login").unwrap().status, RunStatus::Failed);
}

#[tokio::test]
async fn recovery_attempts_are_bounded() {
    let h = harness(|config| {
        config.recovery.enabled = true;
        config.recovery.max_retries = 1;
        config.watchdog.max_consecutive_same_task = 10;
        config.watchdog.global_max_consecutive = 10;
    });
    h.write_task("t1-login.md", SIMPLE_TASK);
    // Attempt 1 fails, recovery says fixed, attempt 2 fails again —
    // the budget is spent, so no second recovery run happens.
    h.orch.agent().push(AgentExecution::blocked("one"));
    h.orch.agent().push(verdict_execution(r#"{"status":"fixed","summary":"hm"}"#));
    h.orch.agent().push(AgentExecution::blocked("two"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert_eq!(h.orch.agent().run_count(), 3, "no recovery after the budget is spent");
    assert_eq!(h.record("t1-login").unwrap().status, RunStatus::Failed);
}

#[tokio::test]
async fn recovery_uses_the_configured_model_and_timeout() {
    let h = harness(|config| {
        config.recovery.enabled = true;
        config.recovery.model = Some("opus".to_string());
        config.recovery.timeout_ms = 1_234;
    });
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(AgentExecution::blocked("x"));
    h.orch.agent().push(verdict_execution(r#"{"status":"unfixable"}"#));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    let requests = h.orch.agent().requests.lock();
    assert_eq!(requests[1].model.as_deref(), Some("opus"));
    assert_eq!(requests[1].timeout_ms, 1_234);
}
