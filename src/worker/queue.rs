//! Queue messages and the line-delimited JSON feed that carries them.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::worker::job::JobArgs;

/// One job invocation request: a registered job name plus keyword arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    pub task: String,
    #[serde(default)]
    pub kwargs: JobArgs,
}

impl JobMessage {
    pub fn new(task: impl Into<String>, kwargs: JobArgs) -> Self {
        Self {
            task: task.into(),
            kwargs,
        }
    }
}

/// Read one [`JobMessage`] per line from `reader` and forward it to `tx`.
///
/// Blank lines are skipped and malformed lines are logged and dropped.
/// Returns the number of messages forwarded once the input ends or the
/// receiver goes away.
pub async fn feed_lines<R>(reader: R, tx: mpsc::Sender<JobMessage>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message: JobMessage = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed job message");
                continue;
            }
        };
        tracing::debug!(task = %message.task, "Queued job message");
        if tx.send(message).await.is_err() {
            tracing::warn!("Job queue closed, stopping feed");
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}
