// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::TaskBuilder;
use std::time::Duration;

fn request() -> AgentRequest {
    AgentRequest::for_task(&TaskBuilder::new("t1").build(), "prompt".into(), None, 1000)
}

#[tokio::test]
async fn fake_agent_replays_responses_in_order() {
    let agent = FakeAgent::new();
    agent.push(AgentExecution::done("first", vec![]));
    agent.push(AgentExecution::blocked("second"));

    let one = agent
        .run(request(), CancellationToken::new(), Box::new(|_| {}))
        .await
        .unwrap();
    assert_eq!(one.status, ContractStatus::Done);
    assert_eq!(one.summary, "first");

    let two = agent
        .run(request(), CancellationToken::new(), Box::new(|_| {}))
        .await
        .unwrap();
    assert_eq!(two.status, ContractStatus::Blocked);
    assert_eq!(agent.run_count(), 2);
}

#[tokio::test]
async fn fake_agent_fires_markers_through_hook() {
    let agent = FakeAgent::new();
    agent.push_with_markers(
        vec![AcMarker::Indexed(1), AcMarker::ByText("route".into())],
        AgentExecution::done("ok", vec![]),
    );

    let mut seen = Vec::new();
    let execution = agent
        .run(request(), CancellationToken::new(), Box::new(|m| seen.push(m.clone())))
        .await
        .unwrap();
    assert_eq!(seen, vec![AcMarker::Indexed(1), AcMarker::ByText("route".into())]);
    assert_eq!(execution.completed_acs, seen);
}

#[tokio::test]
async fn exhausted_script_blocks() {
    let agent = FakeAgent::new();
    let execution = agent
        .run(request(), CancellationToken::new(), Box::new(|_| {}))
        .await
        .unwrap();
    assert_eq!(execution.status, ContractStatus::Blocked);
    assert!(!execution.contract_found);
}

#[tokio::test(start_paused = true)]
async fn slow_response_honors_cancellation() {
    let agent = FakeAgent::new();
    agent.push_slow(Duration::from_secs(3600), AgentExecution::done("never", vec![]));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let execution = agent.run(request(), cancel, Box::new(|_| {})).await.unwrap();
    assert_eq!(execution.end, RunEnd::Cancelled);
    assert_eq!(execution.status, ContractStatus::Blocked);
}

#[test]
fn request_carries_task_identity() {
    let task = TaskBuilder::new("e1/t1").name("Login").priority(fm_core::Priority::P0).build();
    let request = AgentRequest::for_task(&task, "p".into(), Some("opus".into()), 5);
    assert_eq!(request.task_id, "e1/t1");
    assert_eq!(request.task_name, "Login");
    assert_eq!(request.task_priority, "P0");
    assert_eq!(request.model.as_deref(), Some("opus"));
}
