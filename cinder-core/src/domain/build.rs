//! Build record domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one completed run attempt
///
/// Distinct from [`crate::domain::status::ProjectStatus`]: a build record
/// only ever carries a terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    Success,
    Failure,
}

/// Persisted summary of one run's outcome and duration
///
/// Created exactly once per run, after the run reaches a terminal
/// outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    pub project_id: Uuid,
    pub status: BuildStatus,
    /// Human-formatted total execution duration, e.g. "1m 4s"
    pub execution_time: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
