// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciliation state machine.
//!
//! External triggers call [`Orchestrator::schedule`]; triggers are
//! debounced and coalesced into single-flight reconcile passes. A pass
//! picks work under the queue policy, drives the agent through the runner,
//! and commits results back to the board. Failure thresholds and rate-limit
//! signals flip the sticky `halted` flag, cleared only by
//! [`Orchestrator::resume`].

mod execute;
mod reconcile;

pub(crate) use execute::TaskOutcome;

use crate::failures::FailureTracker;
use crate::recovery::AutoRecovery;
use crate::runstore::RunStore;
use crate::watchdog::Watchdog;
use fm_board::BoardClient;
use fm_core::{Clock, Config};
use fm_runner::AgentInvoker;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// What a reconcile pass is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Standalone queue, or epic mode if an epic is open.
    #[default]
    Normal,
    /// Exactly one standalone task.
    Task,
    /// Epic queue only.
    Epic,
}

/// Scheduling state behind one mutex.
#[derive(Default)]
struct SchedState {
    running: bool,
    halted: bool,
    paused: bool,
    pending: bool,
    pending_reasons: Vec<String>,
    pending_mode: RunMode,
    current_task_id: Option<String>,
    /// Tasks the agent finished but whose `Done` write has not landed yet.
    /// Guards against re-running the agent when only the status write
    /// failed; the next reconcile retries the write instead.
    completed_unpersisted: HashMap<String, u64>,
    debounce_gen: u64,
}

/// Status surface for the external command layer.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub active: bool,
    pub current_task_id: Option<String>,
    pub queued_reasons: Vec<String>,
    pub halted: bool,
    pub paused: bool,
}

pub struct Orchestrator<A, C: Clock> {
    pub(crate) config: Config,
    pub(crate) board: BoardClient,
    pub(crate) agent: A,
    pub(crate) clock: C,
    pub(crate) store: RunStore,
    pub(crate) failures: FailureTracker,
    pub(crate) recovery: AutoRecovery,
    pub(crate) watchdog: Watchdog,
    sched: Mutex<SchedState>,
}

impl<A, C> Orchestrator<A, C>
where
    A: AgentInvoker + 'static,
    C: Clock + 'static,
{
    pub fn new(config: Config, board: BoardClient, agent: A, clock: C) -> Arc<Self> {
        let store_path = config
            .run_store_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(".foreman/runs.json"));
        Arc::new(Self {
            store: RunStore::new(store_path),
            failures: FailureTracker::new(&config.watchdog),
            recovery: AutoRecovery::new(config.recovery.clone()),
            watchdog: Watchdog::new(config.watchdog.clone()),
            sched: Mutex::new(SchedState::default()),
            board,
            agent,
            clock,
            config,
        })
    }

    /// The invoker, for test scripting and inspection.
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Enqueue a reconcile pass. The debounce window coalesces bursts; a
    /// trigger arriving while a pass runs is folded into the next loop
    /// iteration. Halted or paused orchestrators log and drop the trigger.
    pub fn schedule(self: &Arc<Self>, reason: &str, mode: RunMode) {
        let generation = {
            let mut sched = self.sched.lock();
            if sched.halted {
                info!(reason, "orchestrator is halted; ignoring trigger");
                return;
            }
            if sched.paused {
                info!(reason, "orchestrator is paused; ignoring trigger");
                return;
            }
            sched.pending = true;
            sched.pending_reasons.push(reason.to_string());
            if mode != RunMode::Normal {
                sched.pending_mode = mode;
            }
            sched.debounce_gen += 1;
            sched.debounce_gen
        };

        let debounce = Duration::from_millis(self.config.queue.debounce_ms);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let fresh = {
                let sched = this.sched.lock();
                sched.debounce_gen == generation && sched.pending
            };
            if fresh {
                this.run_queued().await;
            }
        });
    }

    /// Run pending reconcile passes until none remain. Single-flight: a
    /// second caller returns immediately while the first loops.
    pub async fn run_queued(self: &Arc<Self>) {
        {
            let mut sched = self.sched.lock();
            if sched.running {
                return;
            }
            sched.running = true;
        }

        loop {
            let next = {
                let mut sched = self.sched.lock();
                if sched.halted || !sched.pending {
                    if sched.halted {
                        sched.pending = false;
                        sched.pending_reasons.clear();
                    }
                    sched.running = false;
                    sched.current_task_id = None;
                    None
                } else {
                    sched.pending = false;
                    let reasons = std::mem::take(&mut sched.pending_reasons);
                    let mode = std::mem::replace(&mut sched.pending_mode, RunMode::Normal);
                    Some((reasons, mode))
                }
            };
            let Some((reasons, mode)) = next else { return };

            info!(reasons = ?reasons, mode = ?mode, "reconcile pass starting");
            if let Err(e) = self.reconcile(mode).await {
                warn!(error = %e, "reconcile pass aborted");
            }
        }
    }

    pub fn status(&self) -> OrchestratorStatus {
        let sched = self.sched.lock();
        OrchestratorStatus {
            active: sched.running,
            current_task_id: sched.current_task_id.clone(),
            queued_reasons: sched.pending_reasons.clone(),
            halted: sched.halted,
            paused: sched.paused,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.sched.lock().halted
    }

    /// Clear the halt flag. Returns whether it was set.
    pub fn resume(&self) -> bool {
        let mut sched = self.sched.lock();
        let was_halted = sched.halted;
        sched.halted = false;
        if was_halted {
            info!("halt cleared");
        }
        was_halted
    }

    /// Operator pause: blocks scheduling without the failure semantics of
    /// halt.
    pub fn pause(&self) {
        self.sched.lock().paused = true;
        info!("orchestrator paused");
    }

    pub fn unpause(&self) {
        self.sched.lock().paused = false;
        info!("orchestrator unpaused");
    }

    pub(crate) fn set_halted(&self) {
        let mut sched = self.sched.lock();
        if !sched.halted {
            warn!("orchestrator halted; call resume() to continue");
        }
        sched.halted = true;
    }

    pub(crate) fn set_current_task(&self, task_id: Option<String>) {
        self.sched.lock().current_task_id = task_id;
    }

    pub(crate) fn note_completed_unpersisted(&self, task_id: &str) {
        let now = self.clock.epoch_ms();
        self.sched.lock().completed_unpersisted.insert(task_id.to_string(), now);
    }

    pub(crate) fn clear_completed_unpersisted(&self, task_id: &str) {
        self.sched.lock().completed_unpersisted.remove(task_id);
    }

    pub(crate) fn is_completed_unpersisted(&self, task_id: &str) -> bool {
        self.sched.lock().completed_unpersisted.contains_key(task_id)
    }
}

#[cfg(test)]
#[path = "../orchestrator_tests/mod.rs"]
mod tests;
