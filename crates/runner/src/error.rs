// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors from agent invocation.
///
/// Agent-level failures (timeout, kill, missing contract) are not errors:
/// they come back as a `Blocked` execution so the orchestrator can account
/// them. These are the infrastructure failures underneath.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn agent command {command:?}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("agent stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}
