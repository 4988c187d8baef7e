// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fmd: the Foreman daemon binary.
//!
//! Loads the TOML config, takes the single-instance lock, and runs the
//! orchestrator until ctrl-c. Scheduling comes from the startup trigger
//! and the optional poll timer; command surfaces (manual run, resume)
//! attach through the library API.

use fm_board::BoardClient;
use fm_core::{Config, SystemClock};
use fm_daemon::{DaemonError, Orchestrator, RunMode};
use fm_runner::ProcessRunner;
use fs2::FileExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("fmd: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DaemonError> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("foreman.toml"));
    let config = if config_path.is_file() {
        Config::load(&config_path)?
    } else {
        Config::default()
    };

    let state_dir = config
        .run_store_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(".foreman/runs.json"))
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".foreman"));
    std::fs::create_dir_all(&state_dir)?;

    let file_appender = tracing_appender::rolling::daily(state_dir.join("logs"), "fmd.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    // One orchestrator instance per board
    let lock_path = state_dir.join("daemon.lock");
    let lock_file = std::fs::File::create(&lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| DaemonError::AlreadyRunning(lock_path.clone()))?;

    let board = BoardClient::new(config.board.clone());
    let agent = ProcessRunner::new(config.agent.clone());
    let orchestrator = Orchestrator::new(config.clone(), board, agent, SystemClock);

    if config.queue.run_on_startup {
        orchestrator.schedule("startup", RunMode::Normal);
    }
    if config.queue.poll_interval_ms > 0 {
        let poller = Arc::clone(&orchestrator);
        let interval = Duration::from_millis(config.queue.poll_interval_ms);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                poller.schedule("poll", RunMode::Normal);
            }
        });
    }

    info!(
        board = %config.board.root.display(),
        agent = %config.agent.command,
        "fmd ready"
    );
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
