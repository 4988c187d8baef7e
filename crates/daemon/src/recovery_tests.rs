// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn recovery(max_retries: u32) -> AutoRecovery {
    AutoRecovery::new(RecoveryConfig { max_retries, ..RecoveryConfig::default() })
}

#[test]
fn attempts_are_capped_per_task() {
    let recovery = recovery(2);
    assert!(recovery.try_begin("t1", None));
    assert!(recovery.try_begin("t1", None));
    assert!(!recovery.try_begin("t1", None));
    // Other tasks are unaffected
    assert!(recovery.try_begin("t2", None));
}

#[test]
fn attempts_are_capped_per_epic() {
    let recovery = recovery(2);
    assert!(recovery.try_begin("e1/s1", Some("e1")));
    assert!(recovery.try_begin("e1/s2", Some("e1")));
    // The epic budget is spent even though s3 has never been tried
    assert!(!recovery.try_begin("e1/s3", Some("e1")));
}

#[test]
fn reset_restores_the_task_budget() {
    let recovery = recovery(1);
    assert!(recovery.try_begin("t1", None));
    assert!(!recovery.try_begin("t1", None));
    recovery.reset("t1");
    assert!(recovery.try_begin("t1", None));
}

#[test]
fn disabled_recovery_never_begins() {
    let recovery =
        AutoRecovery::new(RecoveryConfig { enabled: false, ..RecoveryConfig::default() });
    assert!(!recovery.try_begin("t1", None));
}

#[test]
fn parses_fixed_verdict_from_noisy_output() {
    let out = r#"
I patched the import.
{"status": "fixed", "summary": "patched import", "root_cause": "renamed module", "files_changed": ["src/auth.ts"]}
"#;
    let verdict = parse_verdict(out).unwrap();
    assert_eq!(verdict.status, VerdictStatus::Fixed);
    assert_eq!(verdict.root_cause, "renamed module");
    assert_eq!(verdict.files_changed, vec!["src/auth.ts"]);
}

#[yare::parameterized(
    empty      = { "" },
    wrong_enum = { r#"{"status": "done"}"# },
    prose      = { "could not fix it" },
)]
fn unparseable_verdicts_are_none(out: &str) {
    assert!(parse_verdict(out).is_none());
}
