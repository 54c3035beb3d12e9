//! Status & log recorder contract
//!
//! The engine does not persist anything itself; it reports status
//! transitions, line-level execution logs, and per-run build summaries
//! through this trait. The surrounding persistence layer supplies the
//! real implementation; [`InMemoryRecorder`] backs tests and embedded
//! use.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use cinder_core::domain::build::{BuildRecord, BuildStatus};
use cinder_core::domain::log::{self, LogEntry};
use cinder_core::domain::status::ProjectStatus;
use uuid::Uuid;

/// Persistence contract consumed by the engine
///
/// Status writes and build-record writes are separate calls with no
/// transaction spanning them; a crash between the two leaves the status
/// ahead of the record history.
pub trait Recorder: Send + Sync {
    /// Persists the project's current status
    fn record_status(&self, project_id: Uuid, status: ProjectStatus);

    /// Appends one execution log entry
    fn append_log(&self, project_id: Uuid, message: String, logged_at: DateTime<Utc>);

    /// Writes the summary row for a completed run
    fn record_build(
        &self,
        project_id: Uuid,
        status: BuildStatus,
        execution_time: String,
        timestamp: DateTime<Utc>,
    );
}

/// Appends a log entry with the size cap applied
///
/// All engine log writes go through here so no call site can bypass the
/// 4000-character clamp.
pub(crate) fn append_entry(recorder: &dyn Recorder, project_id: Uuid, message: String) {
    recorder.append_log(project_id, log::clamp_message(message), Utc::now());
}

/// One event observed by [`InMemoryRecorder`], in arrival order
#[derive(Debug, Clone)]
pub enum RecordedEvent {
    Status { project_id: Uuid, status: ProjectStatus },
    Log(LogEntry),
    Build(BuildRecord),
}

/// In-memory implementation of [`Recorder`]
///
/// Keeps every write in a single arrival-ordered event list so tests can
/// assert on interleaving, plus per-kind accessors for convenience.
#[derive(Default)]
pub struct InMemoryRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses_for(&self, project_id: Uuid) -> Vec<ProjectStatus> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Status { project_id: id, status } if *id == project_id => {
                    Some(*status)
                }
                _ => None,
            })
            .collect()
    }

    pub fn logs_for(&self, project_id: Uuid) -> Vec<LogEntry> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Log(entry) if entry.project_id == project_id => {
                    Some(entry.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn builds_for(&self, project_id: Uuid) -> Vec<BuildRecord> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Build(record) if record.project_id == project_id => {
                    Some(record.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl Recorder for InMemoryRecorder {
    fn record_status(&self, project_id: Uuid, status: ProjectStatus) {
        let mut events = self.events.lock().unwrap();
        events.push(RecordedEvent::Status { project_id, status });
    }

    fn append_log(&self, project_id: Uuid, message: String, logged_at: DateTime<Utc>) {
        let mut events = self.events.lock().unwrap();
        events.push(RecordedEvent::Log(LogEntry {
            project_id,
            message,
            logged_at,
        }));
    }

    fn record_build(
        &self,
        project_id: Uuid,
        status: BuildStatus,
        execution_time: String,
        timestamp: DateTime<Utc>,
    ) {
        let mut events = self.events.lock().unwrap();
        events.push(RecordedEvent::Build(BuildRecord {
            project_id,
            status,
            execution_time,
            timestamp,
        }));
    }
}
