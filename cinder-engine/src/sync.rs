//! Repository synchronizer
//!
//! Ensures a local working copy of the project's source exists and is
//! current before stages run. The working directory is
//! `<base>/<project.name>`; presence of `.git` inside it is the sole
//! signal distinguishing an update-in-place from a fresh clone.
//!
//! Every sync outcome, success or failure, is appended to the project's
//! execution log before this module returns. No retry is attempted; a
//! transient network failure fails the run.

use std::path::{Path, PathBuf};
use std::process::Command;

use cinder_core::domain::project::{DEFAULT_BRANCH, Project};
use tracing::{debug, error, info};

use crate::error::SyncError;
use crate::recorder::{Recorder, append_entry};

/// URL prefixes the synchronizer accepts without question
const KNOWN_SCHEMES: [&str; 5] = ["http://", "https://", "ssh://", "git://", "file://"];

/// Working-copy synchronization, trait-based so the executor can be
/// tested without a network
pub trait Synchronizer: Send + Sync {
    /// Clones or fast-forwards the project's working copy
    ///
    /// Returns the working directory path on success.
    fn sync(&self, project: &Project, recorder: &dyn Recorder) -> Result<PathBuf, SyncError>;
}

/// Synchronizer backed by the host `git` binary
pub struct GitSynchronizer {
    base_dir: PathBuf,
}

impl GitSynchronizer {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Rejects source URLs with no recognized scheme
    ///
    /// This is a syntax check only; reachability and auth problems are
    /// reported by git itself as [`SyncError::Command`].
    fn validate_url(url: &str) -> Result<(), SyncError> {
        let recognized = KNOWN_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
            // scp-like form: git@host:path
            || (url.contains('@') && url.contains(':') && !url.contains("://"));
        if url.is_empty() || !recognized {
            return Err(SyncError::InvalidUrl {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    /// Runs one git invocation and classifies the outcome
    fn run_git(
        op: &'static str,
        args: &[String],
        current_dir: Option<&Path>,
    ) -> Result<(), SyncError> {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = current_dir {
            command.current_dir(dir);
        }

        debug!("Running git {} with args {:?}", op, args);

        let output = command
            .output()
            .map_err(|source| SyncError::Io { op, source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(SyncError::Command {
                op,
                exit_code: output.status.code().unwrap_or(-1),
                detail,
            });
        }

        Ok(())
    }

    fn update(&self, project: &Project, working_dir: &Path, recorder: &dyn Recorder) -> Result<(), SyncError> {
        match Self::run_git(
            "pull",
            &["pull".to_string(), "--ff-only".to_string()],
            Some(working_dir),
        ) {
            Ok(()) => {
                info!(
                    "Repository updated successfully in {}",
                    working_dir.display()
                );
                append_entry(
                    recorder,
                    project.id,
                    format!("Repository updated successfully in {}", working_dir.display()),
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to update repository in {}: {}", working_dir.display(), e);
                append_entry(
                    recorder,
                    project.id,
                    format!(
                        "Failed to update repository in {}: {}",
                        working_dir.display(),
                        e
                    ),
                );
                Err(e)
            }
        }
    }

    fn clone_fresh(&self, project: &Project, working_dir: &Path, recorder: &dyn Recorder) -> Result<(), SyncError> {
        if let Err(source) = std::fs::create_dir_all(&self.base_dir) {
            return Err(SyncError::Io { op: "clone", source });
        }

        let url = project.source_url.trim().to_string();
        let mut args = vec!["clone".to_string()];
        if project.branch != DEFAULT_BRANCH {
            args.push("--branch".to_string());
            args.push(project.branch.clone());
        }
        args.push(url);
        args.push(working_dir.to_string_lossy().into_owned());

        match Self::run_git("clone", &args, None) {
            Ok(()) => {
                info!(
                    "Repository cloned successfully in {}",
                    working_dir.display()
                );
                append_entry(
                    recorder,
                    project.id,
                    format!("Repository cloned successfully in {}", working_dir.display()),
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to clone repository: {}", e);
                append_entry(
                    recorder,
                    project.id,
                    format!("Failed to clone repository: {}", e),
                );
                Err(e)
            }
        }
    }
}

impl Synchronizer for GitSynchronizer {
    fn sync(&self, project: &Project, recorder: &dyn Recorder) -> Result<PathBuf, SyncError> {
        let url = project.source_url.trim();
        if let Err(e) = Self::validate_url(url) {
            error!("Invalid repository url '{}' for project {}", url, project.name);
            append_entry(
                recorder,
                project.id,
                format!("Invalid repository url '{}'", url),
            );
            return Err(e);
        }

        let working_dir = project.working_dir(&self.base_dir);

        if working_dir.join(".git").exists() {
            self.update(project, &working_dir, recorder)?;
        } else {
            self.clone_fresh(project, &working_dir, recorder)?;
        }

        Ok(working_dir)
    }
}
