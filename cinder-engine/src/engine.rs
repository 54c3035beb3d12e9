//! Engine facade
//!
//! Owns the bounded worker pool, the per-project run locks, and the
//! trigger entry points (manual, webhook, scheduled). Trigger calls
//! return once a run is either rejected (not-found) or accepted for
//! async execution; completion is observed through the returned
//! [`RunHandle`] or through status/log reads.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDateTime;
use cinder_core::domain::trigger::{ScheduledTrigger, TriggerId};
use cinder_core::dto::trigger::WebhookEvent;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{EngineError, Result, ScheduleError};
use crate::executor;
use crate::lock::ProjectLocks;
use crate::notify::Notifier;
use crate::recorder::Recorder;
use crate::scheduler::{TokioTriggerScheduler, TriggerScheduler};
use crate::stage::StageRunner;
use crate::store::ProjectStore;
use crate::sync::{GitSynchronizer, Synchronizer};

/// Shared state behind every run
pub(crate) struct EngineInner {
    pub(crate) config: Config,
    pub(crate) store: Arc<dyn ProjectStore>,
    pub(crate) recorder: Arc<dyn Recorder>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) synchronizer: Arc<dyn Synchronizer>,
    pub(crate) runner: StageRunner,
    pub(crate) locks: ProjectLocks,
    /// Bounds runs in flight across all projects; a permit is held for
    /// the whole run because spawn, drain, and wait block the worker
    pub(crate) pool: Arc<Semaphore>,
}

impl EngineInner {
    pub(crate) fn new(
        config: Config,
        store: Arc<dyn ProjectStore>,
        recorder: Arc<dyn Recorder>,
        notifier: Arc<dyn Notifier>,
        synchronizer: Arc<dyn Synchronizer>,
    ) -> Self {
        let runner = StageRunner::new(config.stage_timeout);
        let pool = Arc::new(Semaphore::new(config.max_parallel_runs));
        Self {
            config,
            store,
            recorder,
            notifier,
            synchronizer,
            runner,
            locks: ProjectLocks::new(),
            pool,
        }
    }
}

/// The execution engine
///
/// Must live inside a tokio runtime; trigger methods spawn tasks on it.
pub struct Engine {
    inner: Arc<EngineInner>,
    scheduler: TokioTriggerScheduler,
}

impl Engine {
    /// Creates an engine that synchronizes through the host git binary
    pub fn new(
        config: Config,
        store: Arc<dyn ProjectStore>,
        recorder: Arc<dyn Recorder>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let synchronizer = Arc::new(GitSynchronizer::new(config.base_dir.clone()));
        Self::with_synchronizer(config, store, recorder, notifier, synchronizer)
    }

    /// Creates an engine with an explicit synchronizer
    pub fn with_synchronizer(
        config: Config,
        store: Arc<dyn ProjectStore>,
        recorder: Arc<dyn Recorder>,
        notifier: Arc<dyn Notifier>,
        synchronizer: Arc<dyn Synchronizer>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.base_dir)
            .with_context(|| format!("failed to create base directory {}", config.base_dir.display()))?;

        let inner = Arc::new(EngineInner::new(
            config,
            store,
            recorder,
            notifier,
            synchronizer,
        ));

        let dispatch = {
            let inner = Arc::clone(&inner);
            Arc::new(move |project_id: Uuid| {
                // Fire-and-forget: errors surface in the run's own
                // bookkeeping and the dispatch task's log line
                let _ = dispatch_run(Arc::clone(&inner), project_id);
            })
        };
        let scheduler = TokioTriggerScheduler::new(dispatch);

        info!("Engine initialized (base: {})", inner.config.base_dir.display());

        Ok(Self { inner, scheduler })
    }

    /// Manual trigger: runs the project now
    ///
    /// Fails fast when the project or its pipeline is missing; otherwise
    /// the run is queued on the worker pool and a handle to its outcome
    /// is returned.
    pub fn execute(&self, project_id: Uuid) -> Result<RunHandle> {
        let project = self
            .inner
            .store
            .find(project_id)
            .ok_or(EngineError::ProjectNotFound(project_id))?;
        if project.pipeline.is_none() {
            return Err(EngineError::PipelineNotFound(project_id));
        }

        Ok(dispatch_run(Arc::clone(&self.inner), project_id))
    }

    /// Webhook trigger: only "push" events start a run
    pub fn handle_webhook(
        &self,
        project_id: Uuid,
        event: &WebhookEvent,
    ) -> Result<Option<RunHandle>> {
        if !event.is_push() {
            debug!(
                "Ignoring webhook event '{}' for project {}",
                event.event, project_id
            );
            return Ok(None);
        }
        self.execute(project_id).map(Some)
    }

    /// Scheduled trigger: defers a run to a local wall-clock instant
    ///
    /// Registering the identical (project, timestamp) pair twice is not
    /// rejected; both triggers fire.
    pub fn schedule_execution(&self, project_id: Uuid, date_time: &str) -> Result<TriggerId> {
        let fire_at: NaiveDateTime =
            date_time
                .parse()
                .map_err(|source| ScheduleError::InvalidTimestamp {
                    input: date_time.to_string(),
                    source,
                })?;
        let trigger = ScheduledTrigger::new(project_id, fire_at);
        Ok(self.scheduler.register(trigger))
    }

    /// Cancels pending triggers with the given identity
    pub fn cancel_scheduled(&self, trigger_id: &TriggerId) -> bool {
        self.scheduler.cancel(trigger_id)
    }

    /// Number of registered triggers that have not fired yet
    pub fn pending_triggers(&self) -> usize {
        self.scheduler.pending_count()
    }
}

/// Queues one run on the worker pool
///
/// The permit is acquired inside the task so trigger callers never wait
/// for pool capacity; the run body executes on the blocking pool.
pub(crate) fn dispatch_run(inner: Arc<EngineInner>, project_id: Uuid) -> RunHandle {
    let handle = tokio::spawn(async move {
        let permit = Arc::clone(&inner.pool)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::Internal("worker pool closed".to_string()))?;

        let worker_inner = Arc::clone(&inner);
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            executor::run_project(&worker_inner, project_id)
        })
        .await
        .map_err(|e| EngineError::Internal(format!("run task panicked: {e}")))?;

        if let Err(ref e) = result {
            error!("Run for project {} failed: {}", project_id, e);
        }
        result
    });

    RunHandle { handle }
}

/// Handle to a dispatched run
#[derive(Debug)]
pub struct RunHandle {
    handle: tokio::task::JoinHandle<Result<()>>,
}

impl RunHandle {
    /// Waits for the run to finish and returns its outcome
    pub async fn wait(self) -> Result<()> {
        self.handle
            .await
            .map_err(|e| EngineError::Internal(format!("run task aborted: {e}")))?
    }
}
