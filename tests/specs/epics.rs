// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::support::env_with_agent;

const EPIC: &str = "---\nname: Auth\ntype: Epic\nstatus: Not Started\n---\n";

const AGENT: &str = r#"cat >/dev/null
echo "$PM_TASK_ID" >> run-order.log
echo '{"ac_complete": 1}'
echo 'proof' > proof.txt
echo '{"status":"done","summary":"done","files":["proof.txt"]}'"#;

fn child(name: &str) -> String {
    format!("---\nname: {name}\ntype: UserStory\nstatus: Not Started\n---\n\n- [ ] ship it\n")
}

#[tokio::test]
async fn s3_epics_run_sequentially_and_close_in_order() {
    let env = env_with_agent(AGENT, |_| {});
    env.write_task("E01-Auth/epic.md", EPIC);
    env.write_task("E01-Auth/s1-1-login.md", &child("Login"));
    env.write_task("E01-Auth/s1-2-logout.md", &child("Logout"));
    env.write_task("E02-Payments/epic.md", "---\nname: Payments\ntype: Epic\nstatus: Not Started\n---\n");
    env.write_task("E02-Payments/s2-1-stripe.md", &child("Stripe"));

    env.run().await;

    // E01's children ran in order and E01 closed; E02 was never touched
    assert_eq!(env.run_order(), vec!["E01-Auth/s1-1-login", "E01-Auth/s1-2-logout"]);
    assert!(env.read_task("E01-Auth/s1-1-login.md").contains("status: Done"));
    assert!(env.read_task("E01-Auth/s1-2-logout.md").contains("status: Done"));
    let epic = env.read_task("E01-Auth/epic.md");
    assert!(epic.contains("status: Done"));
    assert!(epic.contains("## Epic summary"));
    assert!(env.read_task("E02-Payments/epic.md").contains("status: Not Started"));
    assert!(env.read_task("E02-Payments/s2-1-stripe.md").contains("status: Not Started"));

    // The next pass moves on to E02
    env.run().await;
    assert!(env.read_task("E02-Payments/epic.md").contains("status: Done"));
    assert_eq!(
        env.run_order().last().map(String::as_str),
        Some("E02-Payments/s2-1-stripe")
    );
}

#[tokio::test]
async fn stuck_epic_parks_the_queue() {
    let env = env_with_agent(AGENT, |_| {});
    env.write_task(
        "E01-Auth/epic.md",
        "---\nname: Auth\ntype: Epic\nstatus: Blocked\n---\n",
    );
    env.write_task("E01-Auth/s1-1-login.md", &child("Login"));
    env.write_task("E02-Payments/epic.md", EPIC);
    env.write_task("E02-Payments/s2-1-stripe.md", &child("Stripe"));

    env.run().await;

    // Neither E01 (stuck) nor E02 (behind it) made progress
    assert!(env.run_order().is_empty());
    assert!(env.read_task("E02-Payments/epic.md").contains("status: Not Started"));
}

#[tokio::test]
async fn failed_child_stops_the_epic_pass() {
    let env = env_with_agent(
        r#"cat >/dev/null
echo "$PM_TASK_ID" >> run-order.log
case "$PM_TASK_ID" in
  */s1-1-login) echo '{"status":"blocked","notes":"cannot log in"}' ;;
  *) echo 'proof' > proof.txt; echo '{"ac_complete": 1}'; echo '{"status":"done","files":["proof.txt"]}' ;;
esac"#,
        |_| {},
    );
    env.write_task("E01-Auth/epic.md", EPIC);
    env.write_task("E01-Auth/s1-1-login.md", &child("Login"));
    env.write_task("E01-Auth/s1-2-logout.md", &child("Logout"));

    env.run().await;

    assert_eq!(env.run_order(), vec!["E01-Auth/s1-1-login"], "second child never ran");
    assert!(env.read_task("E01-Auth/epic.md").contains("status: In Progress"));
    assert_eq!(env.store_doc()["tasks"]["E01-Auth/s1-1-login"]["status"], "failed");
}
