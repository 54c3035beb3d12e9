//! Stage runner
//!
//! Executes one pipeline stage as an external process in the project's
//! working directory. stdout and stderr are merged into a single
//! combined buffer, line by line, and fully captured before the result
//! is returned; nothing streams to the log in real time.
//!
//! The runner classifies exit codes but never decides pipeline
//! continuation; that is the executor's job.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cinder_core::domain::pipeline::Stage;
use tracing::{debug, warn};

use crate::error::StageError;
use crate::shell::Shell;

/// How often the runner re-checks a child when a timeout is configured
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Outcome of one stage process
#[derive(Debug, Clone)]
pub struct StageResult {
    pub exit_code: i32,
    /// stdout and stderr, merged
    pub combined_output: String,
    pub duration: Duration,
}

impl StageResult {
    /// Exit code 0 is success; any other exit code is failure
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs stage commands through the host shell
pub struct StageRunner {
    shell: Shell,
    timeout: Option<Duration>,
}

impl StageRunner {
    /// Creates a runner for the host OS shell
    ///
    /// `timeout` bounds each stage process when set; `None` lets stages
    /// run indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            shell: Shell::host(),
            timeout,
        }
    }

    /// Executes one stage and captures its combined output
    ///
    /// Blocks the calling thread for the full process lifetime: spawn,
    /// output drain, and wait.
    pub fn run(
        &self,
        stage: &Stage,
        working_dir: &Path,
        env_vars: &HashMap<String, String>,
    ) -> Result<StageResult, StageError> {
        debug!(
            "Executing stage '{}' in {}: {}",
            stage.name,
            working_dir.display(),
            stage.command
        );

        let mut command = self.shell.command(&stage.command);
        command
            .current_dir(working_dir)
            .envs(env_vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| StageError::Spawn {
            stage: stage.name.clone(),
            source,
        })?;

        let combined = Arc::new(Mutex::new(String::new()));
        let stdout_drain = spawn_drain(child.stdout.take(), Arc::clone(&combined));
        let stderr_drain = spawn_drain(child.stderr.take(), Arc::clone(&combined));

        let status = self.wait(&mut child, &stage.name, started)?;

        for drain in [stdout_drain, stderr_drain].into_iter().flatten() {
            if drain.join().is_err() {
                warn!("output drain thread for stage '{}' panicked", stage.name);
            }
        }

        let combined_output = combined.lock().unwrap().clone();
        let duration = started.elapsed();
        let exit_code = status.code().unwrap_or(-1);

        debug!(
            "Stage '{}' exited with code {} after {:?} ({} bytes of output)",
            stage.name,
            exit_code,
            duration,
            combined_output.len()
        );

        Ok(StageResult {
            exit_code,
            combined_output,
            duration,
        })
    }

    /// Waits for the child, enforcing the timeout when one is configured
    fn wait(
        &self,
        child: &mut Child,
        stage_name: &str,
        started: Instant,
    ) -> Result<ExitStatus, StageError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|source| StageError::Wait {
                stage: stage_name.to_string(),
                source,
            });
        };

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(source) => {
                    return Err(StageError::Wait {
                        stage: stage_name.to_string(),
                        source,
                    });
                }
            }

            if started.elapsed() >= timeout {
                warn!("Stage '{}' exceeded {:?}, killing process", stage_name, timeout);
                if let Err(e) = child.kill() {
                    warn!("Failed to kill timed-out stage '{}': {}", stage_name, e);
                }
                // Reap the killed child so it does not linger as a zombie
                let _ = child.wait();
                return Err(StageError::TimedOut {
                    stage: stage_name.to_string(),
                    timeout,
                });
            }

            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }
}

/// Spawns a thread draining one child pipe into the shared buffer
///
/// Merging happens line by line so stdout and stderr interleave at line
/// granularity, matching what a terminal user would see.
fn spawn_drain(
    pipe: Option<impl Read + Send + 'static>,
    combined: Arc<Mutex<String>>,
) -> Option<std::thread::JoinHandle<()>> {
    let pipe = pipe?;
    Some(std::thread::spawn(move || {
        let reader = BufReader::new(pipe);
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    let mut combined = combined.lock().unwrap();
                    combined.push_str(&line);
                    combined.push('\n');
                }
                Err(_) => break,
            }
        }
    }))
}
