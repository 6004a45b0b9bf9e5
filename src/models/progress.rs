use serde::{Deserialize, Serialize};

/// Snapshot of a session's indexing run, as pushed to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub text: String,
    pub complete: bool,
    pub total: usize,
    pub n: usize,
}

impl Progress {
    /// Terminal state of a successful run, also the idle state of a session
    pub fn finished() -> Self {
        Self {
            text: String::new(),
            complete: true,
            total: 0,
            n: 0,
        }
    }

    /// Terminal state of a run aborted by `reason`
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            text: reason.into(),
            complete: true,
            total: 0,
            n: 0,
        }
    }

    /// In-flight state with a status line and no counters
    pub fn status(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            complete: false,
            total: 0,
            n: 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.complete && !self.text.is_empty()
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::finished()
    }
}
