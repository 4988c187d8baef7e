// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-runner: agent subprocess execution and response parsing.
//!
//! The agent is a one-shot child process: prompt in on stdin, free-form
//! text out on stdout. Two signals are recognized in that text — per-AC
//! progress markers, detected line by line while streaming, and a terminal
//! JSON contract located after exit. Everything else is noise.

pub mod contract;
pub mod error;
pub mod invoker;
pub mod markers;
pub mod process;
pub mod prompt;

pub use contract::{find_contract, last_status_object, Contract, ContractStatus};
pub use error::RunnerError;
#[cfg(any(test, feature = "test-support"))]
pub use invoker::FakeAgent;
pub use invoker::{AgentExecution, AgentInvoker, AgentRequest, MarkerHook, RunEnd};
pub use markers::{detect_marker, AcMarker};
pub use process::ProcessRunner;
pub use prompt::{
    build_epic_review_prompt, build_recovery_prompt, build_retry_prompt, build_review_prompt,
    build_task_prompt, categorize_error, format_acs_for_prompt, output_tail, ErrorCategory,
    PromptOptions, RecoveryContext,
};
