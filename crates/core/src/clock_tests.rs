// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_tracks_wall_time() {
    let clock = SystemClock;
    let before = clock.epoch_ms();
    // Sanity: a plausible post-2020 timestamp, not uptime or zero
    assert!(before > 1_577_836_800_000);
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert!(clock.epoch_ms() > before);
}

#[test]
fn fake_clock_starts_where_told_and_advances_on_demand() {
    let clock = FakeClock::at(5_000);
    assert_eq!(clock.epoch_ms(), 5_000);
    clock.advance_ms(250);
    assert_eq!(clock.epoch_ms(), 5_250);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::default();
    let handle = clock.clone();
    handle.advance_ms(30_000);
    assert_eq!(clock.epoch_ms(), handle.epoch_ms());
}
