// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runstore::RunStatus;
use fm_runner::AcMarker;

#[tokio::test]
async fn standalone_task_runs_to_done() {
    let h = harness(|_| {});
    h.write_task("t1-login.md", TASK_WITH_ACS);
    h.orch.agent().push_with_markers(
        vec![AcMarker::Indexed(1), AcMarker::Indexed(2)],
        h.done_with_artifact("implemented login"),
    );

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    let content = h.read_task("t1-login.md");
    assert!(content.contains("status: Done"), "status committed: {content}");
    assert!(content.contains("- [x] render form"));
    assert!(content.contains("- [x] add route"));
    assert!(content.contains("**Summary:** implemented login"));

    let record = h.record("t1-login").unwrap();
    assert_eq!(record.status, RunStatus::Done);
    assert!(record.duration_ms.is_some());
    assert_eq!(record.result.unwrap().summary, "implemented login");
    assert_eq!(h.orch.agent().run_count(), 1);
}

#[tokio::test]
async fn task_prompt_reaches_the_agent_with_env_identity() {
    let h = harness(|_| {});
    h.write_task("t1-login.md", TASK_WITH_ACS);
    h.orch.agent().push(h.done_with_artifact("ok"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    let requests = h.orch.agent().requests.lock();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.task_id, "t1-login");
    assert_eq!(request.task_name, "Login");
    assert_eq!(request.task_priority, "P1");
    assert!(request.prompt.contains("AC-1 [ ] render form"));
    assert!(request.prompt.contains("ac_complete"));
}

#[tokio::test]
async fn blocked_task_records_failure_and_keeps_in_progress() {
    let h = harness(|_| {});
    h.write_task("t1-login.md", TASK_WITH_ACS);
    h.orch.agent().push(AgentExecution::blocked("needs creds"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    let content = h.read_task("t1-login.md");
    assert!(content.contains("status: In Progress"));
    assert!(content.contains("- [ ] render form"), "no checkbox changed");
    assert!(content.contains("## Failed"));

    let record = h.record("t1-login").unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.error.unwrap().contains("needs creds"));
    assert!(!h.orch.is_halted());
}

#[tokio::test]
async fn auto_reset_returns_failed_task_to_not_started() {
    let h = harness(|config| config.auto_reset_failed = true);
    h.write_task("t1-login.md", TASK_WITH_ACS);
    h.orch.agent().push(AgentExecution::blocked("boom"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert!(h.read_task("t1-login.md").contains("status: Not Started"));
}

#[tokio::test]
async fn hallucinated_done_gets_one_corrective_retry() {
    let h = harness(|_| {});
    h.write_task("t1-login.md", SIMPLE_TASK);
    // First run claims done with a ghost file; retry produces a real one
    h.orch.agent().push(AgentExecution::done("trust me", vec!["ghost.ts".to_string()]));
    h.orch.agent().push(h.done_with_artifact("did it for real"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert_eq!(h.orch.agent().run_count(), 2);
    let requests = h.orch.agent().requests.lock();
    assert!(requests[1].prompt.contains("> trust me"), "retry quotes the claim");
    drop(requests);
    assert!(h.read_task("t1-login.md").contains("status: Done"));
}

#[tokio::test]
async fn persistent_hallucination_is_a_failure() {
    let h = harness(|_| {});
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(AgentExecution::done("trust me", vec!["ghost.ts".to_string()]));
    h.orch.agent().push(AgentExecution::done("still lying", vec!["ghost.ts".to_string()]));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert_eq!(h.orch.agent().run_count(), 2);
    assert!(h.read_task("t1-login.md").contains("status: In Progress"));
    let record = h.record("t1-login").unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.error.unwrap().contains("artifact"));
}

#[tokio::test]
async fn unreported_acs_force_the_verification_gate() {
    let h = harness(|_| {});
    h.write_task("t1-login.md", TASK_WITH_ACS);
    // Done, but only AC-1 was ever reported
    h.orch
        .agent()
        .push_with_markers(vec![AcMarker::Indexed(1)], h.done_with_artifact("half done"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    let record = h.record("t1-login").unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.error.unwrap().contains("1/2"));
    assert!(h.read_task("t1-login.md").contains("status: In Progress"));
}

#[tokio::test]
async fn text_markers_check_matching_lines() {
    let h = harness(|_| {});
    h.write_task("t1-login.md", TASK_WITH_ACS);
    h.orch.agent().push_with_markers(
        vec![AcMarker::ByText("render form".into()), AcMarker::ByText("add route".into())],
        h.done_with_artifact("ok"),
    );

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    let content = h.read_task("t1-login.md");
    assert!(content.contains("- [x] render form"));
    assert!(content.contains("- [x] add route"));
    assert!(content.contains("status: Done"));
}

#[tokio::test]
async fn done_write_is_retried_without_rerunning_the_agent() {
    let h = harness(|_| {});
    h.write_task("t1-login.md", "---\nname: Login\ntype: Bug\nstatus: In Progress\n---\n");
    // Simulate "agent finished but the Done write never landed"
    h.orch.note_completed_unpersisted("t1-login");

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert_eq!(h.orch.agent().run_count(), 0, "agent must not run again");
    assert!(h.read_task("t1-login.md").contains("status: Done"));
    assert_eq!(h.record("t1-login").unwrap().status, RunStatus::Done);
    assert!(!h.orch.is_completed_unpersisted("t1-login"));
}

#[tokio::test]
async fn review_pass_runs_on_the_review_model() {
    let h = harness(|config| {
        config.review.review_tasks = true;
        config.review.model = "opus".to_string();
    });
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(h.done_with_artifact("done"));
    h.orch.agent().push(AgentExecution::done("review ok", vec![]));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert_eq!(h.orch.agent().run_count(), 2);
    let requests = h.orch.agent().requests.lock();
    assert_eq!(requests[1].model.as_deref(), Some("opus"));
    assert!(requests[1].prompt.contains("Review the completed task"));
    drop(requests);
    assert!(h.read_task("t1-login.md").contains("status: Done"));
}

#[tokio::test]
async fn blocked_review_fails_the_task() {
    let h = harness(|config| {
        config.review.review_tasks = true;
    });
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(h.done_with_artifact("done"));
    h.orch.agent().push(AgentExecution::blocked("checkboxes lie"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    let record = h.record("t1-login").unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.error.unwrap().contains("review blocked"));
}

#[tokio::test]
async fn review_skipped_when_task_already_runs_the_review_model() {
    let h = harness(|config| {
        config.review.review_tasks = true;
        config.review.model = "opus".to_string();
        config.agent.model = Some("opus".to_string());
    });
    h.write_task("t1-login.md", SIMPLE_TASK);
    h.orch.agent().push(h.done_with_artifact("done"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert_eq!(h.orch.agent().run_count(), 1, "nothing stronger to review with");
    assert!(h.read_task("t1-login.md").contains("status: Done"));
}

#[tokio::test]
async fn task_model_override_reaches_the_request() {
    let h = harness(|config| config.agent.model = Some("sonnet".to_string()));
    h.write_task(
        "t1-login.md",
        "---\nname: Login\ntype: Bug\nstatus: Not Started\nmodel: haiku\n---\n",
    );
    h.orch.agent().push(h.done_with_artifact("ok"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    let requests = h.orch.agent().requests.lock();
    assert_eq!(requests[0].model.as_deref(), Some("haiku"), "frontmatter beats config");
}
