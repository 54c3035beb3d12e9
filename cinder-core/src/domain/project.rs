//! Project domain types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::domain::pipeline::PipelineDefinition;
use crate::domain::status::ProjectStatus;

/// A CI project
///
/// Owns at most one pipeline definition. The execution engine mutates
/// `status` and the last-run fields; name and source mutations belong to
/// the project-management layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    /// Globally unique; also names the working directory under the base dir
    pub name: String,
    pub description: Option<String>,
    pub source_url: String,
    pub branch: String,
    pub status: ProjectStatus,
    pub last_run: Option<chrono::DateTime<chrono::Utc>>,
    /// Formatted duration of the most recent build
    pub last_build_time: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub pipeline: Option<PipelineDefinition>,
}

pub const DEFAULT_BRANCH: &str = "main";

impl Project {
    /// Creates a new project in the `Pending` state
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            source_url: source_url.into(),
            branch: DEFAULT_BRANCH.to_string(),
            status: ProjectStatus::Pending,
            last_run: None,
            last_build_time: None,
            created_at: chrono::Utc::now(),
            pipeline: None,
        }
    }

    pub fn with_pipeline(mut self, pipeline: PipelineDefinition) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Working directory for this project under the configured base
    pub fn working_dir(&self, base: &Path) -> PathBuf {
        base.join(&self.name)
    }
}
