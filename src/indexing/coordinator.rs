use super::{IndexWorker, ProgressReporter, RunSummary};
use crate::metrics::{RUNS_ACTIVE, RUNS_FINISHED_TOTAL, RUNS_STARTED_TOTAL, RUN_DURATION_SECONDS};
use crate::models::Progress;
use crate::session::{RunHandle, Session};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Owns the run lifecycle of every session: `Idle -> Indexing -> Idle`
#[derive(Clone)]
pub struct SessionCoordinator {
    worker: Arc<IndexWorker>,
    reporter: ProgressReporter,
    handshake_timeout: Duration,
}

impl SessionCoordinator {
    pub fn new(worker: IndexWorker, reporter: ProgressReporter, handshake_timeout: Duration) -> Self {
        Self {
            worker: Arc::new(worker),
            reporter,
            handshake_timeout,
        }
    }

    /// Start a run for `session`, or join the one in flight, and wait for its
    /// terminal progress. Every caller of the same run gets the same value.
    pub async fn start_or_join(&self, session: &Arc<Session>) -> Progress {
        let mut done = {
            let mut slot = session.run.lock();
            match slot.as_ref() {
                Some(handle) => {
                    debug!(session_id = %session.id(), "Joining in-flight run");
                    handle.done.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    let halt = CancellationToken::new();
                    *slot = Some(RunHandle {
                        done: rx.clone(),
                        halt: halt.clone(),
                    });

                    let run = Run {
                        coordinator: self.clone(),
                        session: Arc::clone(session),
                        halt,
                        done: tx,
                    };
                    tokio::spawn(run.execute());
                    rx
                }
            }
        };

        // The watch::Ref borrows `done`; it must drop before `done` does
        let terminal = match done.wait_for(Option::is_some).await {
            Ok(terminal) => terminal.clone().unwrap_or_default(),
            Err(_) => Progress::failed("indexing run ended unexpectedly"),
        };
        terminal
    }

    /// Ask the run in flight for `session`, if any, to stop after its current track
    pub fn halt(&self, session: &Session) -> bool {
        match session.run.lock().as_ref() {
            Some(handle) => {
                handle.halt.cancel();
                true
            }
            None => false,
        }
    }
}

/// One spawned run
struct Run {
    coordinator: SessionCoordinator,
    session: Arc<Session>,
    halt: CancellationToken,
    done: watch::Sender<Option<Progress>>,
}

/// Returns the session to idle even if the run task unwinds
struct RunGuard {
    session: Arc<Session>,
    started: Instant,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.session.run.lock().take();
        RUNS_ACTIVE.dec();
        RUN_DURATION_SECONDS.observe(self.started.elapsed().as_secs_f64());
    }
}

impl Run {
    async fn execute(self) {
        let guard = RunGuard {
            session: Arc::clone(&self.session),
            started: Instant::now(),
        };
        RUNS_STARTED_TOTAL.inc();
        RUNS_ACTIVE.inc();
        info!(session_id = %self.session.id(), "Indexing run started");

        let (result, ()) = tokio::join!(
            self.coordinator.worker.run(&self.session, &self.halt),
            self.coordinator.reporter.run(&self.session, &self.halt),
        );

        let terminal = match result {
            Ok(summary) => {
                log_summary(&self.session, &summary);
                RUNS_FINISHED_TOTAL
                    .with_label_values(&[if summary.halted { "halted" } else { "completed" }])
                    .inc();
                Progress::finished()
            }
            Err(e) => {
                error!(session_id = %self.session.id(), error = %e, "Indexing run aborted");
                RUNS_FINISHED_TOTAL.with_label_values(&["failed"]).inc();
                Progress::failed(e.to_string())
            }
        };

        self.session.set_progress(terminal.clone());
        self.session
            .finish_stream(&terminal, self.coordinator.handshake_timeout)
            .await;

        // Idle again before joiners wake, so a caller reacting to this run starts a fresh one
        drop(guard);
        self.done.send_replace(Some(terminal));
    }
}

fn log_summary(session: &Session, summary: &RunSummary) {
    info!(
        session_id = %session.id(),
        fetched = summary.fetched,
        pending = summary.pending,
        indexed = summary.indexed,
        already_present = summary.already_present,
        skipped = summary.skipped,
        halted = summary.halted,
        "Indexing run finished"
    );
}
