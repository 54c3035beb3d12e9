//! Per-project run locks
//!
//! The working directory is shared between runs of the same project, so
//! two overlapping runs would synchronize and execute stages against the
//! same tree. A keyed mutex serializes them: the gate for a project is
//! held for the whole run and released on every exit path when the guard
//! drops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// Map from project id to an exclusive run gate
///
/// Gates are created on first use and kept for the process lifetime; the
/// map grows with the number of distinct projects, not with runs.
#[derive(Default)]
pub struct ProjectLocks {
    gates: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the project's gate is free and returns the held guard
    ///
    /// Must be called from a blocking context (a run worker), never from
    /// an async task.
    pub fn acquire(&self, project_id: Uuid) -> OwnedMutexGuard<()> {
        let gate = {
            let mut gates = self.gates.lock().unwrap();
            Arc::clone(gates.entry(project_id).or_default())
        };
        gate.blocking_lock_owned()
    }
}
