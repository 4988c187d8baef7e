// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Infrastructure errors that end the current reconciliation.
///
/// Per-task failures are not errors — they flow through failure accounting
/// and (maybe) auto-recovery. These are the ones that mean the pass itself
/// cannot continue.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Board(#[from] fm_board::BoardError),

    #[error(transparent)]
    Runner(#[from] fm_runner::RunnerError),

    #[error(transparent)]
    Store(#[from] crate::runstore::StoreError),

    #[error(transparent)]
    Config(#[from] fm_core::ConfigError),

    #[error("another foreman instance owns this board (lock at {0})")]
    AlreadyRunning(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
