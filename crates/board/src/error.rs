// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Errors from board enumeration and mutation.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("board I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unparseable task file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("duplicate task id on board: {0}")]
    DuplicateId(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already exists: {0}")]
    TaskExists(String),
}
