use crate::session::Session;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Streams a session's progress snapshot on a fixed interval
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    interval: Duration,
    send_timeout: Duration,
}

impl ProgressReporter {
    pub fn new(interval: Duration, send_timeout: Duration) -> Self {
        Self {
            interval,
            send_timeout,
        }
    }

    /// Push until a push fails or `halt` fires. Always signals `halt` on exit.
    pub async fn run(&self, session: &Session, halt: &CancellationToken) {
        loop {
            if halt.is_cancelled() {
                break;
            }

            if let Err(e) = session.push_progress(self.send_timeout).await {
                info!(session_id = %session.id(), error = %e, "Progress push failed, halting run");
                break;
            }

            tokio::select! {
                _ = halt.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        debug!(session_id = %session.id(), "Progress reporter stopped");
        halt.cancel();
    }
}
