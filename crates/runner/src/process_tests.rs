// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::contract::ContractStatus;
use crate::markers::AcMarker;
use fm_core::TaskBuilder;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

fn script(dir: &Path, body: &str) -> String {
    let path = dir.join("agent.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().into_owned()
}

fn runner(command: String) -> ProcessRunner {
    ProcessRunner::new(AgentConfig { command, ..AgentConfig::default() })
}

fn request(timeout_ms: u64) -> AgentRequest {
    let task = TaskBuilder::new("t1-login").name("Login").build();
    AgentRequest::for_task(&task, "hello agent".to_string(), None, timeout_ms)
}

#[tokio::test]
async fn streams_markers_and_finds_contract() {
    let dir = TempDir::new().unwrap();
    let cmd = script(
        dir.path(),
        r#"cat >/dev/null
echo 'working...'
echo '{"ac_complete": 1}'
echo '[AC_COMPLETE] add route'
echo '{"status":"done","summary":"ok","files":["src/a.rs"]}'"#,
    );

    let mut seen = Vec::new();
    let execution = runner(cmd)
        .run(request(5_000), CancellationToken::new(), Box::new(|m| seen.push(m.clone())))
        .await
        .unwrap();

    assert_eq!(execution.status, ContractStatus::Done);
    assert!(execution.contract_found);
    assert_eq!(execution.summary, "ok");
    assert_eq!(execution.files, vec!["src/a.rs"]);
    assert_eq!(execution.exit_code, Some(0));
    assert_eq!(execution.end, RunEnd::Exited);
    assert_eq!(seen, vec![AcMarker::Indexed(1), AcMarker::ByText("add route".into())]);
    assert_eq!(execution.completed_acs, seen);
    assert!(execution.stdout.contains("working..."));
}

#[tokio::test]
async fn prompt_arrives_on_stdin() {
    let dir = TempDir::new().unwrap();
    let cmd = script(
        dir.path(),
        r#"prompt=$(cat)
printf '{"status":"done","notes":"%s"}\n' "$prompt""#,
    );

    let execution = runner(cmd)
        .run(request(5_000), CancellationToken::new(), Box::new(|_| {}))
        .await
        .unwrap();
    assert_eq!(execution.notes, "hello agent");
}

#[tokio::test]
async fn task_identity_is_exported_to_the_environment() {
    let dir = TempDir::new().unwrap();
    let cmd = script(
        dir.path(),
        r#"cat >/dev/null
printf '{"status":"done","summary":"%s/%s"}\n' "$PM_TASK_ID" "$PM_TASK_NAME""#,
    );

    let execution = runner(cmd)
        .run(request(5_000), CancellationToken::new(), Box::new(|_| {}))
        .await
        .unwrap();
    assert_eq!(execution.summary, "t1-login/Login");
}

#[tokio::test]
async fn missing_contract_is_blocked_even_on_zero_exit() {
    let dir = TempDir::new().unwrap();
    let cmd = script(dir.path(), "cat >/dev/null\necho 'all finished, trust me'");

    let execution = runner(cmd)
        .run(request(5_000), CancellationToken::new(), Box::new(|_| {}))
        .await
        .unwrap();
    assert_eq!(execution.status, ContractStatus::Blocked);
    assert!(!execution.contract_found);
    assert_eq!(execution.exit_code, Some(0));
    assert!(execution.notes.contains("no terminal contract"));
}

#[tokio::test]
async fn contract_wins_over_nonzero_exit() {
    let dir = TempDir::new().unwrap();
    let cmd = script(
        dir.path(),
        r#"cat >/dev/null
echo '{"status":"done","summary":"ok"}'
exit 3"#,
    );

    let execution = runner(cmd)
        .run(request(5_000), CancellationToken::new(), Box::new(|_| {}))
        .await
        .unwrap();
    assert_eq!(execution.status, ContractStatus::Done);
    assert_eq!(execution.exit_code, Some(3));
}

#[tokio::test]
async fn stderr_is_captured_separately() {
    let dir = TempDir::new().unwrap();
    let cmd = script(dir.path(), "cat >/dev/null\necho 'oops' >&2");

    let execution = runner(cmd)
        .run(request(5_000), CancellationToken::new(), Box::new(|_| {}))
        .await
        .unwrap();
    assert!(execution.stderr.contains("oops"));
    assert!(!execution.stdout.contains("oops"));
}

#[tokio::test]
async fn timeout_terminates_the_child() {
    let dir = TempDir::new().unwrap();
    let cmd = script(dir.path(), "sleep 30");

    let started = std::time::Instant::now();
    let execution = runner(cmd)
        .run(request(200), CancellationToken::new(), Box::new(|_| {}))
        .await
        .unwrap();

    assert_eq!(execution.end, RunEnd::TimedOut);
    assert_eq!(execution.status, ContractStatus::Blocked);
    assert!(execution.notes.contains("timed out"));
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[tokio::test]
async fn cancellation_terminates_the_child() {
    let dir = TempDir::new().unwrap();
    let cmd = script(dir.path(), "sleep 30");

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let execution = runner(cmd)
        .run(request(60_000), cancel, Box::new(|_| {}))
        .await
        .unwrap();
    assert_eq!(execution.end, RunEnd::Cancelled);
    assert_eq!(execution.status, ContractStatus::Blocked);
}

#[tokio::test]
async fn unknown_command_is_a_spawn_error() {
    let result = runner("/nonexistent/agent-binary".to_string())
        .run(request(1_000), CancellationToken::new(), Box::new(|_| {}))
        .await;
    assert!(matches!(result, Err(RunnerError::Spawn { .. })));
}
