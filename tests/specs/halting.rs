// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::support::env_with_agent;
use fm_daemon::RunMode;

const TASK: &str = "---\nname: Login\ntype: UserStory\nstatus: Not Started\n---\n\nWork.\n";

#[tokio::test]
async fn s6_rate_limit_message_halts_the_orchestrator() {
    let env = env_with_agent(
        r#"cat >/dev/null
echo "you've hit your limit (resets in 3h)" >&2
exit 1"#,
        |_| {},
    );
    env.write_task("t1-login.md", TASK);
    env.write_task("t2-later.md", TASK);

    env.run().await;

    assert!(env.orch.is_halted());
    assert_eq!(env.store_doc()["tasks"]["t1-login"]["status"], "failed");
    // The second task never ran: the halt stopped the pass
    assert!(env.store_doc()["tasks"].get("t2-later").is_none());

    // Scheduling is inert until resume()
    env.orch.schedule("manual", RunMode::Normal);
    env.orch.run_queued().await;
    assert!(env.store_doc()["tasks"].get("t2-later").is_none());

    assert!(env.orch.resume());
    assert!(!env.orch.is_halted());
}

#[tokio::test]
async fn watchdog_bound_holds_for_a_hung_agent() {
    let env = env_with_agent("sleep 60", |config| {
        config.watchdog.interval_ms = 100;
        config.watchdog.max_warnings = 2;
        config.agent.timeout_ms = 30_000;
    });
    env.write_task("t1-login.md", TASK);

    let started = std::time::Instant::now();
    env.run().await;

    // interval × max_warnings plus the kill grace, with slack for CI
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
    let record = &env.store_doc()["tasks"]["t1-login"];
    assert_eq!(record["status"], "failed");
    assert!(record["error"].as_str().unwrap().contains("watchdog"));
}

#[tokio::test]
async fn consecutive_failures_trip_the_global_threshold() {
    let env = env_with_agent(
        r#"cat >/dev/null
echo '{"status":"blocked","notes":"no"}'"#,
        |config| {
            config.watchdog.max_consecutive_same_task = 10;
            config.watchdog.global_max_consecutive = 2;
            config.auto_reset_failed = true;
        },
    );
    env.write_task("a-one.md", TASK);
    env.write_task("b-two.md", TASK);

    env.run().await;
    assert!(!env.orch.is_halted());

    env.orch.schedule("again", RunMode::Normal);
    env.orch.run_queued().await;
    assert!(env.orch.is_halted());
}
