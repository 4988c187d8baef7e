// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    zero        = { 0, "0s" },
    sub_second  = { 900, "0s" },
    seconds     = { 45_000, "45s" },
    minutes     = { 200_000, "3m 20s" },
    exact_hour  = { 3_600_000, "1h 0m" },
    hours       = { 3_840_000, "1h 4m" },
)]
fn formats(ms: u64, expected: &str) {
    assert_eq!(format_elapsed_ms(ms), expected);
}
