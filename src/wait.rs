//! Poll loop for "wait until this file appears".
//!
//! Cross-process hand-off happens through the filesystem, so the waiting side
//! simply re-checks the path on a fixed interval. The loop yields to the
//! runtime between checks and never blocks the HTTP acceptor.

use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Lower bound on the poll interval so a zero setting cannot spin
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How often to check, how often to report progress, and when to give up.
#[derive(Clone, Copy, Debug)]
pub struct WaitSchedule {
    pub poll_interval: Duration,
    pub progress_interval: Duration,
    /// `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl WaitSchedule {
    pub fn new(poll_interval: Duration, progress_interval: Duration) -> Self {
        Self {
            poll_interval,
            progress_interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&crate::config::WaitConfig> for WaitSchedule {
    fn from(config: &crate::config::WaitConfig) -> Self {
        WaitSchedule::new(config.poll_interval(), config.progress_interval())
            .with_timeout(config.timeout())
    }
}

/// Wait until `path` is a regular file.
///
/// Returns `true` once present, `false` if the timeout elapses or `cancel`
/// fires first.
pub async fn wait_for_file(
    path: &Path,
    schedule: WaitSchedule,
    cancel: &CancellationToken,
) -> bool {
    info!(path = %path.display(), "Waiting for file");

    let poll_interval = schedule.poll_interval.max(MIN_POLL_INTERVAL);
    let started = Instant::now();
    let mut last_progress = started;

    loop {
        if path.is_file() {
            info!(path = %path.display(), "File present");
            return true;
        }

        let mut nap = poll_interval;
        if let Some(timeout) = schedule.timeout {
            let Some(remaining) = timeout.checked_sub(started.elapsed()).filter(|r| !r.is_zero())
            else {
                info!(
                    path = %path.display(),
                    timeout_secs = timeout.as_secs_f64(),
                    "Wait for file timed out"
                );
                return false;
            };
            nap = nap.min(remaining);
        }

        if last_progress.elapsed() >= schedule.progress_interval {
            info!(
                path = %path.display(),
                waited_secs = started.elapsed().as_secs(),
                "Still waiting for file..."
            );
            last_progress = Instant::now();
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(path = %path.display(), "Wait for file cancelled");
                return false;
            }
            _ = sleep(nap) => {}
        }
    }
}
