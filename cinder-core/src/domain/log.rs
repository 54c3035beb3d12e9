//! Execution log domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum stored length of a single log message, in characters
pub const MAX_LOG_MESSAGE_CHARS: usize = 4000;

/// Marker appended to messages cut at [`MAX_LOG_MESSAGE_CHARS`]
pub const TRUNCATION_MARKER: &str = "... [TRUNCATED]";

/// One notable event during a run
///
/// Append-only; belongs to exactly one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub project_id: Uuid,
    pub message: String,
    pub logged_at: chrono::DateTime<chrono::Utc>,
}

/// Enforces the per-entry size cap before persistence
///
/// Messages longer than [`MAX_LOG_MESSAGE_CHARS`] are cut to exactly
/// that many characters with [`TRUNCATION_MARKER`] appended; shorter
/// messages pass through verbatim.
pub fn clamp_message(message: String) -> String {
    match message.char_indices().nth(MAX_LOG_MESSAGE_CHARS) {
        Some((byte_idx, _)) => {
            let mut clamped = message[..byte_idx].to_string();
            clamped.push_str(TRUNCATION_MARKER);
            clamped
        }
        None => message,
    }
}
