//! Scheduled trigger domain types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A one-shot deferred execution request
///
/// Consumed and discarded once fired; not persisted across process
/// restart. Identity is derived from the (project, timestamp) pair, so
/// registering the identical pair twice yields two triggers with the
/// same id, and both fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTrigger {
    pub project_id: Uuid,
    /// Target wall-clock time, interpreted in the host's local timezone
    pub fire_at: NaiveDateTime,
}

impl ScheduledTrigger {
    pub fn new(project_id: Uuid, fire_at: NaiveDateTime) -> Self {
        Self { project_id, fire_at }
    }

    /// Derived identity for this trigger
    pub fn trigger_id(&self) -> TriggerId {
        TriggerId(format!(
            "trigger_{}_{}",
            self.project_id,
            self.fire_at.and_utc().timestamp_millis()
        ))
    }
}

/// Identity of a registered trigger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerId(pub String);

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_pair_derives_identical_id() {
        let project_id = Uuid::new_v4();
        let at: NaiveDateTime = "2026-03-01T10:30:00".parse().unwrap();
        let a = ScheduledTrigger::new(project_id, at);
        let b = ScheduledTrigger::new(project_id, at);
        assert_eq!(a.trigger_id(), b.trigger_id());
    }

    #[test]
    fn test_distinct_timestamps_derive_distinct_ids() {
        let project_id = Uuid::new_v4();
        let a = ScheduledTrigger::new(project_id, "2026-03-01T10:30:00".parse().unwrap());
        let b = ScheduledTrigger::new(project_id, "2026-03-01T10:30:01".parse().unwrap());
        assert_ne!(a.trigger_id(), b.trigger_id());
    }
}
