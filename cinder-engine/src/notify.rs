//! Success notification contract
//!
//! Notification delivery (email, chat, server push) lives outside the
//! engine. The executor renders a plain-text summary and hands it to the
//! notifier fire-and-forget: a delivery failure is logged and never
//! fails the run.

use tracing::info;
use uuid::Uuid;

/// Notification sink consumed by the engine
pub trait Notifier: Send + Sync {
    fn notify_success(&self, project_id: Uuid, summary: &str) -> anyhow::Result<()>;
}

/// Notifier that only emits a tracing event
///
/// The default when no delivery channel is wired up.
#[derive(Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_success(&self, project_id: Uuid, summary: &str) -> anyhow::Result<()> {
        info!("build success notification for project {}: {}", project_id, summary);
        Ok(())
    }
}

/// Renders the plain-text success summary handed to the notifier
pub fn render_success_summary(project_name: &str, execution_time: &str, output_tail: &str) -> String {
    format!(
        "Project '{project_name}' built successfully in {execution_time}.\n\nLast stage output:\n{output_tail}"
    )
}

/// Returns the last `max_lines` lines of `output`
pub(crate) fn output_tail(output: &str, max_lines: usize) -> &str {
    let mut newlines_seen = 0;
    for (idx, _) in output.rmatch_indices('\n') {
        // A trailing newline delimits nothing
        if idx + 1 == output.len() {
            continue;
        }
        newlines_seen += 1;
        if newlines_seen == max_lines {
            return &output[idx + 1..];
        }
    }
    output
}
