// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run watchdog.
//!
//! Every agent execution gets an independent timer that logs a warning at
//! each interval and, once the warning budget is spent, cancels the
//! runner's token. The runner turns that into SIGTERM → SIGKILL, so no
//! execution outlives `interval_ms × max_warnings` by more than the kill
//! grace period.

use fm_core::{format_elapsed_ms, WatchdogConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct Watchdog {
    config: WatchdogConfig,
}

/// Stops the watchdog loop when dropped or explicitly stopped.
pub struct WatchdogHandle {
    stop: CancellationToken,
}

impl WatchdogHandle {
    pub fn stop(self) {
        self.stop.cancel();
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

impl Watchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self { config }
    }

    /// Begin guarding a run. `cancel` is the runner's token; it is
    /// cancelled when the warning budget runs out. A disabled watchdog
    /// returns an inert handle.
    pub fn start(&self, task_id: &str, cancel: CancellationToken) -> WatchdogHandle {
        let stop = CancellationToken::new();
        if !self.config.enabled {
            return WatchdogHandle { stop };
        }

        let interval = Duration::from_millis(self.config.interval_ms);
        let max_warnings = self.config.max_warnings;
        let task_id = task_id.to_string();
        let loop_stop = stop.clone();

        tokio::spawn(async move {
            let mut warnings = 0u32;
            loop {
                tokio::select! {
                    _ = loop_stop.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        warnings += 1;
                        let elapsed = format_elapsed_ms(interval.as_millis() as u64 * u64::from(warnings));
                        warn!(
                            task = %task_id,
                            warnings,
                            max_warnings,
                            elapsed = %elapsed,
                            "task is still running"
                        );
                        if warnings >= max_warnings {
                            warn!(task = %task_id, "watchdog budget spent, killing the run");
                            cancel.cancel();
                            break;
                        }
                    }
                }
            }
        });

        WatchdogHandle { stop }
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
