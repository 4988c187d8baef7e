// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn config(interval_ms: u64, max_warnings: u32) -> WatchdogConfig {
    WatchdogConfig { enabled: true, interval_ms, max_warnings, ..WatchdogConfig::default() }
}

#[tokio::test(start_paused = true)]
async fn cancels_the_run_after_the_warning_budget() {
    let watchdog = Watchdog::new(config(1_000, 3));
    let cancel = CancellationToken::new();
    let _handle = watchdog.start("t1", cancel.clone());

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(!cancel.is_cancelled(), "two warnings are under the budget");

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert!(cancel.is_cancelled(), "third warning kills the run");
}

#[tokio::test(start_paused = true)]
async fn stopping_the_handle_ends_the_loop() {
    let watchdog = Watchdog::new(config(1_000, 2));
    let cancel = CancellationToken::new();
    let handle = watchdog.start("t1", cancel.clone());

    handle.stop();
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert!(!cancel.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_ends_the_loop() {
    let watchdog = Watchdog::new(config(1_000, 2));
    let cancel = CancellationToken::new();
    drop(watchdog.start("t1", cancel.clone()));

    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert!(!cancel.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn disabled_watchdog_never_fires() {
    let watchdog = Watchdog::new(WatchdogConfig { enabled: false, ..config(100, 1) });
    let cancel = CancellationToken::new();
    let _handle = watchdog.start("t1", cancel.clone());

    tokio::time::sleep(Duration::from_millis(60_000)).await;
    assert!(!cancel.is_cancelled());
}
