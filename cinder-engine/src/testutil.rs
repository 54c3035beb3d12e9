//! Shared test fixtures

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cinder_core::domain::pipeline::{PipelineDefinition, Stage};
use cinder_core::domain::project::Project;

use crate::config::Config;
use crate::engine::EngineInner;
use crate::error::SyncError;
use crate::notify::{Notifier, TracingNotifier};
use crate::recorder::{InMemoryRecorder, Recorder, append_entry};
use crate::store::{InMemoryProjectStore, ProjectStore};
use crate::sync::Synchronizer;

/// Initializes tracing output for a test, honoring RUST_LOG
///
/// Safe to call from every test; only the first call installs the
/// subscriber.
pub(crate) fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Synchronizer that fabricates an empty working copy
///
/// Lets executor and engine tests run without git or a network while
/// keeping the sync log contract intact.
pub(crate) struct StubSynchronizer {
    base_dir: PathBuf,
}

impl StubSynchronizer {
    pub(crate) fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl Synchronizer for StubSynchronizer {
    fn sync(&self, project: &Project, recorder: &dyn Recorder) -> Result<PathBuf, SyncError> {
        let working_dir = project.working_dir(&self.base_dir);
        std::fs::create_dir_all(&working_dir).map_err(|source| SyncError::Io {
            op: "clone",
            source,
        })?;
        append_entry(
            recorder,
            project.id,
            format!("Repository cloned successfully in {}", working_dir.display()),
        );
        Ok(working_dir)
    }
}

/// Synchronizer that always reports a transport failure
pub(crate) struct FailingSynchronizer;

impl Synchronizer for FailingSynchronizer {
    fn sync(&self, project: &Project, recorder: &dyn Recorder) -> Result<PathBuf, SyncError> {
        append_entry(
            recorder,
            project.id,
            "Failed to clone repository: could not resolve host".to_string(),
        );
        Err(SyncError::Command {
            op: "clone",
            exit_code: 128,
            detail: "could not resolve host".to_string(),
        })
    }
}

/// Notifier whose delivery always fails
pub(crate) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify_success(&self, _project_id: uuid::Uuid, _summary: &str) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay unavailable")
    }
}

/// A project named "demo" with one stage per (name, command) pair
pub(crate) fn sample_project(stages: &[(&str, &str)]) -> Project {
    let stages = stages
        .iter()
        .map(|(name, command)| Stage::new(*name, *command))
        .collect();
    Project::new("demo", "https://example.com/demo.git")
        .with_pipeline(PipelineDefinition::new("default", stages))
}

/// Executor-level harness around [`EngineInner`] with inspectable
/// collaborators
pub(crate) struct Harness {
    pub(crate) inner: Arc<EngineInner>,
    pub(crate) store: Arc<InMemoryProjectStore>,
    pub(crate) recorder: Arc<InMemoryRecorder>,
    config: Config,
    notifier: Arc<dyn Notifier>,
    synchronizer: Arc<dyn Synchronizer>,
}

pub(crate) fn harness(base_dir: &Path) -> Harness {
    let config = Config::new(base_dir);
    let store = Arc::new(InMemoryProjectStore::new());
    let recorder = Arc::new(InMemoryRecorder::new());
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let synchronizer: Arc<dyn Synchronizer> = Arc::new(StubSynchronizer::new(base_dir));
    let inner = build_inner(&config, &store, &recorder, &notifier, &synchronizer);

    Harness {
        inner,
        store,
        recorder,
        config,
        notifier,
        synchronizer,
    }
}

fn build_inner(
    config: &Config,
    store: &Arc<InMemoryProjectStore>,
    recorder: &Arc<InMemoryRecorder>,
    notifier: &Arc<dyn Notifier>,
    synchronizer: &Arc<dyn Synchronizer>,
) -> Arc<EngineInner> {
    Arc::new(EngineInner::new(
        config.clone(),
        Arc::clone(store) as Arc<dyn ProjectStore>,
        Arc::clone(recorder) as Arc<dyn Recorder>,
        Arc::clone(notifier),
        Arc::clone(synchronizer),
    ))
}

impl Harness {
    pub(crate) fn set_synchronizer(&mut self, synchronizer: impl Synchronizer + 'static) {
        self.synchronizer = Arc::new(synchronizer);
        self.rebuild();
    }

    pub(crate) fn set_notifier(&mut self, notifier: impl Notifier + 'static) {
        self.notifier = Arc::new(notifier);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.inner = build_inner(
            &self.config,
            &self.store,
            &self.recorder,
            &self.notifier,
            &self.synchronizer,
        );
    }
}
