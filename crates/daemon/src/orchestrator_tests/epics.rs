// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runstore::RunStatus;

const EPIC: &str = "---\nname: Auth\ntype: Epic\nstatus: Not Started\n---\n";

fn child(name: &str) -> String {
    format!("---\nname: {name}\ntype: UserStory\nstatus: Not Started\n---\n\nWork.\n")
}

#[tokio::test]
async fn epic_children_run_in_order_then_the_epic_closes() {
    let h = harness(|_| {});
    h.write_task("E01-Auth/epic.md", EPIC);
    h.write_task("E01-Auth/s1-1-login.md", &child("Login"));
    h.write_task("E01-Auth/s1-2-logout.md", &child("Logout"));
    h.write_task("E02-Payments/epic.md", EPIC);
    h.orch.agent().push(h.done_with_artifact("login done"));
    h.orch.agent().push(h.done_with_artifact("logout done"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    // Children ran in filename order
    let requests = h.orch.agent().requests.lock();
    assert_eq!(requests[0].task_id, "E01-Auth/s1-1-login");
    assert_eq!(requests[1].task_id, "E01-Auth/s1-2-logout");
    drop(requests);

    assert!(h.read_task("E01-Auth/s1-1-login.md").contains("status: Done"));
    assert!(h.read_task("E01-Auth/s1-2-logout.md").contains("status: Done"));

    let epic = h.read_task("E01-Auth/epic.md");
    assert!(epic.contains("status: Done"), "epic auto-closed: {epic}");
    assert!(epic.contains("## Epic summary"));
    assert!(epic.contains("E01-Auth/s1-1-login"));

    // The later epic was never touched while E01 was open
    assert!(h.read_task("E02-Payments/epic.md").contains("status: Not Started"));
    assert_eq!(h.orch.agent().run_count(), 2);
}

#[tokio::test]
async fn starting_an_epic_initializes_child_statuses() {
    let h = harness(|_| {});
    h.write_task("E01-Auth/epic.md", EPIC);
    h.write_task("E01-Auth/s1-1-login.md", &child("Login"));
    h.write_task("E01-Auth/s1-2-logout.md", &child("Logout"));
    // First child fails, stopping the pass after initialization
    h.orch.agent().push(AgentExecution::blocked("stuck"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert!(h.read_task("E01-Auth/epic.md").contains("status: In Progress"));
    assert!(h.read_task("E01-Auth/s1-1-login.md").contains("status: In Progress"));
    assert!(h.read_task("E01-Auth/s1-2-logout.md").contains("status: Not Started"));
}

#[tokio::test]
async fn open_epic_preempts_standalone_work() {
    let h = harness(|_| {});
    h.write_task("a-standalone.md", SIMPLE_TASK);
    h.write_task("E01-Auth/epic.md", EPIC);
    h.write_task("E01-Auth/s1-1-login.md", &child("Login"));
    h.orch.agent().push(h.done_with_artifact("child done"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    let requests = h.orch.agent().requests.lock();
    assert_eq!(requests[0].task_id, "E01-Auth/s1-1-login", "epic work first");
}

#[tokio::test]
async fn standalone_queue_resumes_after_epics_close() {
    let h = harness(|_| {});
    h.write_task("a-standalone.md", SIMPLE_TASK);
    h.write_task("E01-Auth/epic.md", EPIC);
    h.write_task("E01-Auth/s1-1-login.md", &child("Login"));
    h.orch.agent().push(h.done_with_artifact("child done"));
    h.orch.agent().push(h.done_with_artifact("standalone done"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert!(h.read_task("E01-Auth/epic.md").contains("status: Done"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();
    assert!(h.read_task("a-standalone.md").contains("status: Done"));
    assert_eq!(h.orch.agent().run_count(), 2);
}

#[tokio::test]
async fn empty_epic_is_started_but_never_closed() {
    let h = harness(|_| {});
    h.write_task("E01-Auth/epic.md", EPIC);

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    let epic = h.read_task("E01-Auth/epic.md");
    assert!(epic.contains("status: In Progress"));
    assert_eq!(h.orch.agent().run_count(), 0);
}

#[tokio::test]
async fn failed_child_keeps_the_epic_open() {
    let h = harness(|_| {});
    h.write_task("E01-Auth/epic.md", EPIC);
    h.write_task("E01-Auth/s1-1-login.md", &child("Login"));
    h.orch.agent().push(AgentExecution::blocked("no dice"));

    h.orch.reconcile(RunMode::Normal).await.unwrap();

    assert!(h.read_task("E01-Auth/epic.md").contains("status: In Progress"));
    assert_eq!(h.record("E01-Auth/s1-1-login").unwrap().status, RunStatus::Failed);
}

#[tokio::test]
async fn epic_review_gates_the_close() {
    let h = harness(|config| {
        config.review.review_epics = true;
        config.review.model = "opus".to_string();
    });
    // The epic already ran: in progress with every child done
    h.write_task("E01-Auth/epic.md", "---\nname: Auth\ntype: Epic\nstatus: In Progress\n---\n");
    h.write_task(
        "E01-Auth/s1-1-login.md",
        "---\nname: Login\ntype: UserStory\nstatus: Done\n---\n",
    );
    h.orch.agent().push(AgentExecution::blocked("integration gap"));

    h.orch.reconcile(RunMode::Epic).await.unwrap();
    assert!(
        !h.read_task("E01-Auth/epic.md").contains("status: Done"),
        "blocked review leaves the epic open"
    );

    h.orch.agent().push(AgentExecution::done("fits together", vec![]));
    h.orch.reconcile(RunMode::Epic).await.unwrap();
    let epic = h.read_task("E01-Auth/epic.md");
    assert!(epic.contains("status: Done"));

    let requests = h.orch.agent().requests.lock();
    assert!(requests.iter().all(|r| r.model.as_deref() == Some("opus")));
    assert!(requests[0].prompt.contains("Review the completed epic"));
}
