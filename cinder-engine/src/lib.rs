//! Cinder Engine
//!
//! The execution engine of the Cinder CI executor: given a project with a
//! git source and an ordered list of shell stages, it synchronizes the
//! working copy, runs the stages in order, records per-stage and per-run
//! outcomes, and reports final status.
//!
//! Architecture:
//! - Configuration: base directory, pool size, optional stage timeout
//! - Collaborators: project store, status/log recorder, notifier
//!   (trait-based so the surrounding API/persistence layers can plug in)
//! - Sync: working-copy clone/fast-forward via the host git binary
//! - Stage runner: one shell process per stage, combined output capture
//! - Executor: drives the ordered stage list for one run
//! - Engine: bounded worker pool, per-project run locks, trigger entry
//!   points (manual, webhook, scheduled)
//!
//! Runs execute as blocking tasks: process spawn, output drain, and wait
//! occupy a worker for the whole run.

pub mod config;
pub mod engine;
pub mod error;
pub mod lock;
pub mod notify;
pub mod recorder;
pub mod scheduler;
pub mod shell;
pub mod stage;
pub mod store;
pub mod sync;

mod executor;

pub use config::Config;
pub use engine::{Engine, RunHandle};
pub use error::{EngineError, Result, ScheduleError, StageError, SyncError};
pub use executor::format_duration;
pub use notify::{Notifier, TracingNotifier};
pub use recorder::{InMemoryRecorder, RecordedEvent, Recorder};
pub use scheduler::{TokioTriggerScheduler, TriggerScheduler};
pub use stage::{StageResult, StageRunner};
pub use store::{InMemoryProjectStore, ProjectStore};
pub use sync::{GitSynchronizer, Synchronizer};

#[cfg(test)]
pub(crate) mod testutil;
