//! Per-session streaming channel abstraction

use crate::models::Progress;
use async_trait::async_trait;

/// Errors raised by a streaming channel
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelError {
    /// Peer went away
    #[error("channel closed by peer")]
    Closed,

    /// Frame could not be written
    #[error("send failed: {0}")]
    Send(String),

    /// Peer did not answer in time
    #[error("peer did not acknowledge within {0:?}")]
    Timeout(std::time::Duration),
}

/// Bidirectional client connection that receives progress frames
#[async_trait]
pub trait ProgressChannel: Send {
    /// Push one progress frame
    async fn send(&mut self, progress: &Progress) -> Result<(), ChannelError>;

    /// Block until the client sends anything or disconnects
    async fn await_ack(&mut self) -> Result<(), ChannelError>;

    /// Close the connection; errors are ignored
    async fn close(&mut self);
}
