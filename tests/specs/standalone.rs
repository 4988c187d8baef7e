// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::support::env_with_agent;

const LOGIN_TASK: &str = "---\nname: Login\npriority: P1\ntype: UserStory\nstatus: Not Started\n---\n\n- [ ] render form\n- [ ] add route\n";

#[tokio::test]
async fn s1_standalone_task_runs_to_done() {
    let env = env_with_agent(
        r#"cat >/dev/null
echo "$PM_TASK_ID" >> run-order.log
echo '{"ac_complete": 1}'
echo '{"ac_complete": 2}'
mkdir -p src && echo 'login' > src/login.ts
echo '{"status":"done","summary":"ok","files":["src/login.ts"]}'"#,
        |_| {},
    );
    env.write_task("t1-login.md", LOGIN_TASK);

    env.run().await;

    let content = env.read_task("t1-login.md");
    assert!(content.contains("status: Done"), "final status: {content}");
    assert!(content.contains("- [x] render form"));
    assert!(content.contains("- [x] add route"));

    let record = &env.store_doc()["tasks"]["t1-login"];
    assert_eq!(record["status"], "done");
    assert!(record["duration_ms"].as_u64().unwrap() > 0);
    assert_eq!(record["result"]["summary"], "ok");
    assert_eq!(env.run_order(), vec!["t1-login"]);
}

#[tokio::test]
async fn s2_blocked_agent_leaves_the_task_in_progress() {
    let env = env_with_agent(
        r#"cat >/dev/null
echo '{"status":"blocked","notes":"needs creds"}'"#,
        |_| {},
    );
    env.write_task("t1-login.md", LOGIN_TASK);

    env.run().await;

    let content = env.read_task("t1-login.md");
    assert!(content.contains("status: In Progress"));
    assert!(content.contains("- [ ] render form"), "no checkbox changed");
    assert!(content.contains("- [ ] add route"));

    let record = &env.store_doc()["tasks"]["t1-login"];
    assert_eq!(record["status"], "failed");
    assert!(record["error"].as_str().unwrap().contains("needs creds"));
    assert!(!env.orch.is_halted());
}

#[tokio::test]
async fn s2_variant_auto_reset_returns_to_not_started() {
    let env = env_with_agent(
        r#"cat >/dev/null
echo '{"status":"blocked","notes":"needs creds"}'"#,
        |config| config.auto_reset_failed = true,
    );
    env.write_task("t1-login.md", LOGIN_TASK);

    env.run().await;
    assert!(env.read_task("t1-login.md").contains("status: Not Started"));
}

#[tokio::test]
async fn s4_hallucinated_done_is_retried_then_failed() {
    let env = env_with_agent(
        r#"cat >/dev/null
echo "$PM_TASK_ID" >> run-order.log
echo '{"status":"done","summary":"all done","files":["nonexistent.ts"]}'"#,
        |_| {},
    );
    env.write_task("t1-login.md", "---\nname: Login\ntype: UserStory\nstatus: Not Started\n---\n\nWork.\n");

    env.run().await;

    // One corrective retry, then the failure is recorded
    assert_eq!(env.run_order().len(), 2);
    let record = &env.store_doc()["tasks"]["t1-login"];
    assert_eq!(record["status"], "failed");
    assert!(record["error"].as_str().unwrap().contains("artifact"));
    assert!(env.read_task("t1-login.md").contains("status: In Progress"));
}
