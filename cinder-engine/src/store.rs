//! Project store contract
//!
//! Project CRUD lives outside the engine; the executor only needs to
//! look projects up and stamp the last-run fields after a terminal
//! outcome.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use cinder_core::domain::project::Project;
use uuid::Uuid;

/// Read/stamp access to project metadata, consumed by the engine
pub trait ProjectStore: Send + Sync {
    /// Looks up a project by id
    fn find(&self, project_id: Uuid) -> Option<Project>;

    /// Stamps the last-run timestamp and formatted build duration
    fn update_last_run(&self, project_id: Uuid, at: DateTime<Utc>, build_time: String);
}

/// In-memory implementation of [`ProjectStore`]
#[derive(Default)]
pub struct InMemoryProjectStore {
    projects: Mutex<HashMap<Uuid, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, project: Project) {
        let mut projects = self.projects.lock().unwrap();
        projects.insert(project.id, project);
    }
}

impl ProjectStore for InMemoryProjectStore {
    fn find(&self, project_id: Uuid) -> Option<Project> {
        let projects = self.projects.lock().unwrap();
        projects.get(&project_id).cloned()
    }

    fn update_last_run(&self, project_id: Uuid, at: DateTime<Utc>, build_time: String) {
        let mut projects = self.projects.lock().unwrap();
        if let Some(project) = projects.get_mut(&project_id) {
            project.last_run = Some(at);
            project.last_build_time = Some(build_time);
        }
    }
}
