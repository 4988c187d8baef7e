// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-daemon: the Foreman orchestrator.
//!
//! Owns the reconciliation state machine and everything that keeps it
//! honest: the watchdog, failure thresholds, the run-history store, the
//! auto-recovery pass, and the working-tree check that catches agents
//! claiming work they never did.

pub mod error;
pub mod failures;
pub mod gitcheck;
pub mod orchestrator;
pub mod recovery;
pub mod runstore;
pub mod watchdog;

pub use error::DaemonError;
pub use failures::{is_rate_limit_message, FailureTracker};
pub use gitcheck::{any_declared_file_exists, GitState};
pub use orchestrator::{Orchestrator, OrchestratorStatus, RunMode};
pub use recovery::{parse_verdict, AutoRecovery, RecoveryVerdict, VerdictStatus};
pub use runstore::{EpicSummary, ExecutionRecord, RunResult, RunStatus, RunStore, StoreError};
pub use watchdog::{Watchdog, WatchdogHandle};
