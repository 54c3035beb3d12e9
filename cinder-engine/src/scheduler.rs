//! Execution scheduler
//!
//! One-shot deferred triggers: a registered trigger sleeps until its
//! target wall-clock instant, dispatches exactly one run, and is
//! discarded. Triggers live in memory only and do not survive a process
//! restart.
//!
//! The trait keeps the executor's contract independent of the backing:
//! the tokio implementation here can later be replaced by a durable
//! queue without touching the engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use cinder_core::domain::trigger::{ScheduledTrigger, TriggerId};
use tracing::info;
use uuid::Uuid;

/// Callback that starts a run for a project
pub type DispatchFn = Arc<dyn Fn(Uuid) + Send + Sync>;

/// Deferred-task registry consumed by the engine
pub trait TriggerScheduler: Send + Sync {
    /// Registers a one-shot trigger and returns its derived identity
    ///
    /// Duplicate registration of an identical (project, timestamp) pair
    /// is not rejected: it yields the same identity twice and two
    /// independent firings.
    fn register(&self, trigger: ScheduledTrigger) -> TriggerId;

    /// Drops pending triggers with the given identity before they fire
    fn cancel(&self, trigger_id: &TriggerId) -> bool;
}

struct PendingTrigger {
    trigger_id: TriggerId,
    task: Option<tokio::task::JoinHandle<()>>,
}

/// Timer-backed in-memory scheduler
///
/// Must be used inside a tokio runtime; each registration spawns a
/// sleeping task.
pub struct TokioTriggerScheduler {
    dispatch: DispatchFn,
    pending: Arc<Mutex<HashMap<u64, PendingTrigger>>>,
    next_seq: AtomicU64,
}

impl TokioTriggerScheduler {
    pub fn new(dispatch: DispatchFn) -> Self {
        Self {
            dispatch,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Number of triggers registered but not yet fired or cancelled
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Time left until `fire_at` on the local clock; past instants fire
    /// immediately
    fn delay_until(fire_at: NaiveDateTime) -> Duration {
        let now = Local::now().naive_local();
        (fire_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

impl TriggerScheduler for TokioTriggerScheduler {
    fn register(&self, trigger: ScheduledTrigger) -> TriggerId {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let trigger_id = trigger.trigger_id();
        let delay = Self::delay_until(trigger.fire_at);

        info!(
            "Scheduled run for project {} at {} ({})",
            trigger.project_id, trigger.fire_at, trigger_id
        );

        // The slot exists before the task does, so a zero-delay firing
        // always finds its own entry to remove
        {
            let mut pending = self.pending.lock().unwrap();
            pending.insert(
                seq,
                PendingTrigger {
                    trigger_id: trigger_id.clone(),
                    task: None,
                },
            );
        }

        let dispatch = Arc::clone(&self.dispatch);
        let pending = Arc::clone(&self.pending);
        let project_id = trigger.project_id;
        let fired_id = trigger_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!("Firing scheduled trigger {} for project {}", fired_id, project_id);
            (dispatch)(project_id);
            pending.lock().unwrap().remove(&seq);
        });

        if let Some(entry) = self.pending.lock().unwrap().get_mut(&seq) {
            entry.task = Some(task);
        }

        trigger_id
    }

    fn cancel(&self, trigger_id: &TriggerId) -> bool {
        let mut pending = self.pending.lock().unwrap();
        let seqs: Vec<u64> = pending
            .iter()
            .filter(|(_, entry)| &entry.trigger_id == trigger_id)
            .map(|(seq, _)| *seq)
            .collect();

        for seq in &seqs {
            if let Some(entry) = pending.remove(seq)
                && let Some(task) = entry.task
            {
                task.abort();
            }
        }

        !seqs.is_empty()
    }
}
