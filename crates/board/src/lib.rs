// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-board: file-based Kanban board access for Foreman.
//!
//! The board is a directory tree of markdown files with a small fenced
//! metadata block at the top of each file. This crate owns the codec for
//! that block, the acceptance-criteria scanner, and the client that
//! enumerates and mutates task files.

pub mod acs;
pub mod client;
pub mod error;
pub mod frontmatter;

pub use acs::{parse_acs, AcceptanceCriterion};
pub use client::{BoardClient, NewTask};
pub use error::BoardError;
pub use frontmatter::{parse, serialize, update_field, Document, Frontmatter};
