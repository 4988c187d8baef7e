// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn tracker(max_same: u32, max_global: u32) -> FailureTracker {
    FailureTracker::new(&WatchdogConfig {
        max_consecutive_same_task: max_same,
        global_max_consecutive: max_global,
        ..WatchdogConfig::default()
    })
}

#[test]
fn same_task_threshold_halts() {
    let tracker = tracker(3, 100);
    assert!(!tracker.record_failure("t1", "T1"));
    assert!(!tracker.record_failure("t1", "T1"));
    assert!(tracker.record_failure("t1", "T1"));
}

#[test]
fn global_threshold_halts_across_tasks() {
    let tracker = tracker(100, 3);
    assert!(!tracker.record_failure("t1", "T1"));
    assert!(!tracker.record_failure("t2", "T2"));
    assert!(tracker.record_failure("t3", "T3"));
}

#[test]
fn success_clears_both_counters() {
    let tracker = tracker(2, 3);
    assert!(!tracker.record_failure("t1", "T1"));
    assert!(!tracker.record_failure("t2", "T2"));
    tracker.record_success("t1");

    // t1's streak is gone and the global streak restarted
    assert!(!tracker.record_failure("t1", "T1"));
    assert!(!tracker.record_failure("t2", "T2"));
    // ...but t2 was never cleared, so its second failure trips the cap
    assert!(tracker.record_failure("t2", "T2"));
}

#[yare::parameterized(
    claude_limit  = { "you've hit your limit (resets in 3h)", true },
    rate_limited  = { "HTTP 429: Rate limit exceeded", true },
    quota         = { "monthly quota exceeded for this key", true },
    plain_failure = { "segfault in module foo", false },
    empty         = { "", false },
)]
fn rate_limit_detection(message: &str, expected: bool) {
    assert_eq!(is_rate_limit_message(message), expected);
}
