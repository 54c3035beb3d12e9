//! Pipeline executor
//!
//! Drives one run end to end: status to RUNNING, one synchronization,
//! stages strictly in order, then terminal bookkeeping. Stage and sync
//! failures are converted into status transitions, log entries, and a
//! build record before the original error is re-raised to the caller.

use std::time::{Duration, Instant};

use chrono::Utc;
use cinder_core::domain::build::BuildStatus;
use cinder_core::domain::status::ProjectStatus;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::EngineInner;
use crate::error::{EngineError, Result, StageError};
use crate::notify;
use crate::recorder::append_entry;

/// Lines of stage output included in the success notification
const SUMMARY_TAIL_LINES: usize = 20;

/// Executes one run for `project_id`, blocking until it finishes
///
/// Holds the project's run gate for the whole duration; a concurrent run
/// of the same project waits here until the gate is free.
pub(crate) fn run_project(inner: &EngineInner, project_id: Uuid) -> Result<()> {
    let project = inner
        .store
        .find(project_id)
        .ok_or(EngineError::ProjectNotFound(project_id))?;
    let pipeline = project
        .pipeline
        .clone()
        .ok_or(EngineError::PipelineNotFound(project_id))?;

    let _gate = inner.locks.acquire(project_id);

    let started = Instant::now();
    info!(
        "Starting run for project '{}' ({} stage(s))",
        project.name,
        pipeline.stages.len()
    );

    let status = project.status.transition_to(ProjectStatus::Running)?;
    inner.recorder.record_status(project_id, status);
    append_entry(
        inner.recorder.as_ref(),
        project_id,
        format!("Starting pipeline '{}'", pipeline.name),
    );

    let working_dir = match inner.synchronizer.sync(&project, inner.recorder.as_ref()) {
        Ok(dir) => dir,
        Err(e) => {
            finish_failure(inner, project_id, status, started);
            return Err(e.into());
        }
    };

    let mut last_output = String::new();
    for stage in &pipeline.stages {
        info!(
            "Executing stage '{}' for project '{}'",
            stage.name, project.name
        );
        append_entry(
            inner.recorder.as_ref(),
            project_id,
            format!("Starting stage: {}", stage.name),
        );

        match inner.runner.run(stage, &working_dir, &pipeline.env_vars) {
            Ok(result) if result.success() => {
                append_entry(
                    inner.recorder.as_ref(),
                    project_id,
                    format!(
                        "Stage '{}' succeeded.\nOutput:\n{}",
                        stage.name, result.combined_output
                    ),
                );
                last_output = result.combined_output;
            }
            Ok(result) => {
                error!(
                    "Stage '{}' failed with exit code {}",
                    stage.name, result.exit_code
                );
                append_entry(
                    inner.recorder.as_ref(),
                    project_id,
                    format!(
                        "Stage '{}' failed with exit code {}",
                        stage.name, result.exit_code
                    ),
                );
                finish_failure(inner, project_id, status, started);
                return Err(StageError::ExitStatus {
                    stage: stage.name.clone(),
                    exit_code: result.exit_code,
                }
                .into());
            }
            Err(e) => {
                error!("Stage '{}' could not be executed: {}", stage.name, e);
                append_entry(
                    inner.recorder.as_ref(),
                    project_id,
                    format!("Stage '{}' could not be executed: {}", stage.name, e),
                );
                finish_failure(inner, project_id, status, started);
                return Err(e.into());
            }
        }
    }

    let execution_time = format_duration(started.elapsed());
    let status = status.transition_to(ProjectStatus::Success)?;
    inner.recorder.record_status(project_id, status);
    inner.recorder.record_build(
        project_id,
        BuildStatus::Success,
        execution_time.clone(),
        Utc::now(),
    );
    inner
        .store
        .update_last_run(project_id, Utc::now(), execution_time.clone());
    append_entry(
        inner.recorder.as_ref(),
        project_id,
        "Pipeline completed successfully".to_string(),
    );
    info!(
        "Run for project '{}' succeeded in {}",
        project.name, execution_time
    );

    let summary = notify::render_success_summary(
        &project.name,
        &execution_time,
        notify::output_tail(&last_output, SUMMARY_TAIL_LINES),
    );
    if let Err(e) = inner.notifier.notify_success(project_id, &summary) {
        warn!(
            "Failed to send success notification for project {}: {:#}",
            project_id, e
        );
    }

    Ok(())
}

/// Terminal bookkeeping for a failed run
///
/// The status write and the build-record write are separate persistence
/// calls; nothing spans them transactionally.
fn finish_failure(inner: &EngineInner, project_id: Uuid, status: ProjectStatus, started: Instant) {
    let execution_time = format_duration(started.elapsed());

    match status.transition_to(ProjectStatus::Failed) {
        Ok(failed) => inner.recorder.record_status(project_id, failed),
        Err(e) => warn!(
            "Skipping status write after failed run of project {}: {}",
            project_id, e
        ),
    }

    inner.recorder.record_build(
        project_id,
        BuildStatus::Failure,
        execution_time.clone(),
        Utc::now(),
    );
    inner
        .store
        .update_last_run(project_id, Utc::now(), execution_time);
}

/// Formats a duration as "<h>h <m>m <s>s", omitting zero-valued leading
/// units, with "0s" as the floor
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h "));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m "));
    }
    if seconds > 0 || out.is_empty() {
        out.push_str(&format!("{seconds}s"));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::recorder::RecordedEvent;
    use crate::store::ProjectStore;
    use crate::testutil::{FailingNotifier, FailingSynchronizer, harness, sample_project};
    use cinder_core::domain::build::BuildStatus;
    use tempfile::TempDir;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_millis(400)), "0s");
        assert_eq!(format_duration(Duration::from_secs(4)), "4s");
        assert_eq!(format_duration(Duration::from_secs(61)), "1m 1s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(3601)), "1h 1s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_format_duration_is_lossless_at_second_granularity() {
        // Parsing the formatted string back recovers the input, so the
        // formatted duration is non-decreasing in wall-clock inputs
        fn parse_back(formatted: &str) -> u64 {
            formatted
                .split_whitespace()
                .map(|part| {
                    let (value, unit) = part.split_at(part.len() - 1);
                    let value: u64 = value.parse().unwrap();
                    match unit {
                        "h" => value * 3600,
                        "m" => value * 60,
                        _ => value,
                    }
                })
                .sum()
        }

        for secs in [0, 1, 59, 60, 61, 3599, 3600, 3601, 7322] {
            assert_eq!(parse_back(&format_duration(Duration::from_secs(secs))), secs);
        }
    }

    #[test]
    fn test_missing_project_fails_fast_with_no_records() {
        let base = TempDir::new().unwrap();
        let h = harness(base.path());
        let unknown = Uuid::new_v4();

        let err = run_project(&h.inner, unknown).unwrap_err();
        assert!(matches!(err, EngineError::ProjectNotFound(_)));
        assert!(h.recorder.events().is_empty());
    }

    #[test]
    fn test_missing_pipeline_fails_fast_with_no_records() {
        let base = TempDir::new().unwrap();
        let h = harness(base.path());
        let mut project = sample_project(&[("build", "echo hi")]);
        project.pipeline = None;
        let project_id = project.id;
        h.store.insert(project);

        let err = run_project(&h.inner, project_id).unwrap_err();
        assert!(matches!(err, EngineError::PipelineNotFound(_)));
        assert!(h.recorder.events().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn test_all_stages_succeed() {
        let base = TempDir::new().unwrap();
        let h = harness(base.path());
        let project = sample_project(&[("first", "echo one"), ("second", "echo two")]);
        let project_id = project.id;
        h.store.insert(project);

        run_project(&h.inner, project_id).unwrap();

        assert_eq!(
            h.recorder.statuses_for(project_id),
            vec![ProjectStatus::Running, ProjectStatus::Success]
        );

        let builds = h.recorder.builds_for(project_id);
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].status, BuildStatus::Success);

        let messages: Vec<String> = h
            .recorder
            .logs_for(project_id)
            .into_iter()
            .map(|entry| entry.message)
            .collect();
        assert!(messages.iter().any(|m| m.contains("Stage 'first' succeeded")));
        assert!(messages.iter().any(|m| m.contains("Output:\none")));
        assert!(messages.iter().any(|m| m.contains("Stage 'second' succeeded")));

        let stamped = h.store.find(project_id).unwrap();
        assert!(stamped.last_run.is_some());
        assert!(stamped.last_build_time.is_some());
    }

    #[test]
    #[cfg(unix)]
    fn test_failing_stage_stops_the_pipeline() {
        let base = TempDir::new().unwrap();
        let h = harness(base.path());
        let project = sample_project(&[
            ("first", "echo one"),
            ("second", "exit 7"),
            ("third", "echo three"),
        ]);
        let project_id = project.id;
        h.store.insert(project);

        let err = run_project(&h.inner, project_id).unwrap_err();
        match err {
            EngineError::Stage(StageError::ExitStatus { stage, exit_code }) => {
                assert_eq!(stage, "second");
                assert_eq!(exit_code, 7);
            }
            other => panic!("expected stage failure, got {other:?}"),
        }

        assert_eq!(
            h.recorder.statuses_for(project_id),
            vec![ProjectStatus::Running, ProjectStatus::Failed]
        );

        let builds = h.recorder.builds_for(project_id);
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].status, BuildStatus::Failure);

        // Exactly the first two stages left entries; the third never ran
        let messages: Vec<String> = h
            .recorder
            .logs_for(project_id)
            .into_iter()
            .map(|entry| entry.message)
            .collect();
        let started: Vec<&String> = messages
            .iter()
            .filter(|m| m.starts_with("Starting stage:"))
            .collect();
        assert_eq!(started.len(), 2);
        assert!(messages.iter().any(|m| m.contains("Stage 'second' failed with exit code 7")));
        assert!(!messages.iter().any(|m| m.contains("third")));
    }

    #[test]
    fn test_sync_failure_fails_the_run() {
        let base = TempDir::new().unwrap();
        let mut h = harness(base.path());
        h.set_synchronizer(FailingSynchronizer);
        let project = sample_project(&[("build", "echo hi")]);
        let project_id = project.id;
        h.store.insert(project);

        let err = run_project(&h.inner, project_id).unwrap_err();
        assert!(matches!(err, EngineError::Sync(SyncError::Command { .. })));

        assert_eq!(
            h.recorder.statuses_for(project_id),
            vec![ProjectStatus::Running, ProjectStatus::Failed]
        );
        let builds = h.recorder.builds_for(project_id);
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].status, BuildStatus::Failure);

        // No stage ever started
        assert!(
            !h.recorder
                .logs_for(project_id)
                .iter()
                .any(|entry| entry.message.starts_with("Starting stage:"))
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_status_write_precedes_build_record() {
        // The two persistence calls are separate and ordered; a crash
        // between them would leave FAILED status with no matching record
        let base = TempDir::new().unwrap();
        let h = harness(base.path());
        let project = sample_project(&[("boom", "exit 1")]);
        let project_id = project.id;
        h.store.insert(project);

        let _ = run_project(&h.inner, project_id);

        let events = h.recorder.events();
        let failed_at = events
            .iter()
            .position(|e| {
                matches!(e, RecordedEvent::Status { status, .. } if *status == ProjectStatus::Failed)
            })
            .unwrap();
        let build_at = events
            .iter()
            .position(|e| matches!(e, RecordedEvent::Build(_)))
            .unwrap();
        assert!(failed_at < build_at);
    }

    #[test]
    #[cfg(unix)]
    fn test_notifier_failure_does_not_fail_the_run() {
        let base = TempDir::new().unwrap();
        let mut h = harness(base.path());
        h.set_notifier(FailingNotifier);
        let project = sample_project(&[("build", "echo hi")]);
        let project_id = project.id;
        h.store.insert(project);

        run_project(&h.inner, project_id).unwrap();

        assert_eq!(
            h.recorder.statuses_for(project_id),
            vec![ProjectStatus::Running, ProjectStatus::Success]
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_long_stage_output_is_clamped_in_the_log() {
        use cinder_core::domain::log::{MAX_LOG_MESSAGE_CHARS, TRUNCATION_MARKER};

        let base = TempDir::new().unwrap();
        let h = harness(base.path());
        let project = sample_project(&[("noisy", "yes x | head -n 3000")]);
        let project_id = project.id;
        h.store.insert(project);

        run_project(&h.inner, project_id).unwrap();

        let success_entry = h
            .recorder
            .logs_for(project_id)
            .into_iter()
            .find(|entry| entry.message.contains("succeeded"))
            .unwrap();
        assert!(success_entry.message.ends_with(TRUNCATION_MARKER));
        let kept = success_entry
            .message
            .strip_suffix(TRUNCATION_MARKER)
            .unwrap();
        assert_eq!(kept.chars().count(), MAX_LOG_MESSAGE_CHARS);
    }
}
