//! Trigger request DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to defer a project run to a target wall-clock time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub project_id: Uuid,
    /// ISO-8601 local date-time, e.g. "2026-03-01T10:30:00"
    pub date_time: String,
}

/// Inbound webhook event
///
/// Only the event type is inspected; the payload is carried through
/// untouched for the project-management layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WebhookEvent {
    /// Returns true when this event should start a run
    pub fn is_push(&self) -> bool {
        self.event.eq_ignore_ascii_case("push")
    }
}
