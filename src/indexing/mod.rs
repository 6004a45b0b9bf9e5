//! Per-session indexing runs.
//!
//! A run pairs an [`IndexWorker`] (fetch, dedup, resolve lyrics, index) with a
//! [`ProgressReporter`] streaming snapshots to the client. The two are peers
//! sharing one cancellation token: whichever stops first halts the other.
//! [`SessionCoordinator`] keeps at most one run per session and lets any
//! number of callers join it.

mod coordinator;
mod dedup;
mod indexer;
mod reporter;
mod worker;

pub use coordinator::SessionCoordinator;
pub use dedup::filter_unindexed;
pub use indexer::{DocumentIndexer, IndexError, IndexOutcome};
pub use reporter::ProgressReporter;
pub use worker::{IndexWorker, RunError, RunSummary};

/// Status line shown while the lyric phase runs
pub const INDEXING_TEXT: &str = "Indexing lyrics";
