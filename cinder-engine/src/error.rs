//! Error types for the Cinder engine

use std::time::Duration;

use cinder_core::domain::status::InvalidTransition;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while triggering or running a pipeline
#[derive(Debug, Error)]
pub enum EngineError {
    /// No project exists for the given id; fatal to the run, nothing recorded
    #[error("project not found: {0}")]
    ProjectNotFound(Uuid),

    /// The project exists but has no pipeline definition
    #[error("pipeline not found for project: {0}")]
    PipelineNotFound(Uuid),

    /// Repository synchronization failed
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A stage failed or could not be executed
    #[error(transparent)]
    Stage(#[from] StageError),

    /// A deferred execution request was rejected
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// The engine attempted an illegal status transition
    #[error("status bookkeeping error: {0}")]
    Transition(#[from] InvalidTransition),

    /// Internal error (worker pool failure, panicked run task)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors from the repository synchronizer
///
/// An unreachable or private remote surfaces as `Command`; a malformed
/// source URL surfaces as `InvalidUrl`. Callers log them differently but
/// both abort the run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The source URL has no recognized scheme
    #[error("invalid repository url: '{url}'")]
    InvalidUrl { url: String },

    /// A git invocation exited nonzero (network, auth, missing remote)
    #[error("git {op} failed with exit code {exit_code}: {detail}")]
    Command {
        op: &'static str,
        exit_code: i32,
        detail: String,
    },

    /// The git binary could not be spawned or the filesystem failed
    #[error("git {op} could not be run: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from stage execution
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage process exited nonzero
    #[error("stage '{stage}' failed with exit code {exit_code}")]
    ExitStatus { stage: String, exit_code: i32 },

    /// The shell process could not be spawned
    #[error("failed to spawn stage '{stage}': {source}")]
    Spawn {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the stage process failed
    #[error("failed waiting on stage '{stage}': {source}")]
    Wait {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    /// The stage exceeded the configured timeout and was killed
    #[error("stage '{stage}' timed out after {timeout:?}")]
    TimedOut { stage: String, timeout: Duration },
}

/// Errors from the execution scheduler
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The supplied date-time string is not ISO-8601 local date-time
    #[error("invalid date/time '{input}': {source}")]
    InvalidTimestamp {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl EngineError {
    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound(_) | Self::PipelineNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let id = Uuid::new_v4();
        assert!(EngineError::ProjectNotFound(id).is_not_found());
        assert!(EngineError::PipelineNotFound(id).is_not_found());
        assert!(!EngineError::Internal("boom".to_string()).is_not_found());
    }

    #[test]
    fn test_sync_error_messages_distinguish_causes() {
        let invalid = SyncError::InvalidUrl {
            url: "not a url".to_string(),
        };
        let transport = SyncError::Command {
            op: "clone",
            exit_code: 128,
            detail: "could not resolve host".to_string(),
        };
        assert!(invalid.to_string().contains("invalid repository url"));
        assert!(transport.to_string().contains("exit code 128"));
    }
}
