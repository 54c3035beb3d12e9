//! Engine configuration
//!
//! Defines all configurable parameters for the engine including the
//! repository base directory, worker pool bound, and the optional
//! per-stage timeout.

use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory holding one working copy per project
    pub base_dir: PathBuf,

    /// Max runs executing at once across all projects
    pub max_parallel_runs: usize,

    /// Per-stage execution timeout
    ///
    /// `None` (the default) lets a stage run indefinitely, matching the
    /// engine's original behavior; a hung command then blocks its worker
    /// until the process exits.
    pub stage_timeout: Option<Duration>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_parallel_runs: 2,
            stage_timeout: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - CINDER_BASE_DIR (required)
    /// - CINDER_MAX_PARALLEL_RUNS (optional, default: 2)
    /// - CINDER_STAGE_TIMEOUT (optional, seconds, default: unset)
    pub fn from_env() -> anyhow::Result<Self> {
        let base_dir = std::env::var("CINDER_BASE_DIR")
            .map_err(|_| anyhow::anyhow!("CINDER_BASE_DIR environment variable not set"))?;

        let max_parallel_runs = std::env::var("CINDER_MAX_PARALLEL_RUNS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(2);

        let stage_timeout = std::env::var("CINDER_STAGE_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        Ok(Self {
            base_dir: PathBuf::from(base_dir),
            max_parallel_runs,
            stage_timeout,
        })
    }

    pub fn with_max_parallel_runs(mut self, max_parallel_runs: usize) -> Self {
        self.max_parallel_runs = max_parallel_runs;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            anyhow::bail!("base_dir cannot be empty");
        }

        if self.max_parallel_runs == 0 {
            anyhow::bail!("max_parallel_runs must be greater than 0");
        }

        if self.stage_timeout == Some(Duration::ZERO) {
            anyhow::bail!("stage_timeout must be greater than 0 when set");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("cinder-workspaces"))
    }
}
