//! Progress streaming over a WebSocket.
//!
//! A client that opens `/ws` with a valid session cookie becomes the session's
//! streaming channel and starts (or joins) the indexing run. Progress frames are
//! JSON text; after the terminal frame the server waits for any client message
//! as acknowledgement before closing.

use super::handlers::lookup_session;
use crate::api::AppState;
use crate::models::Progress;
use crate::session::{ChannelError, ProgressChannel};
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use tracing::{debug, info, warn};

/// Close code sent when the upgrade request carries no known session
pub const CLOSE_NO_SESSION: u16 = 4000;

/// WebSocket endpoint handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let session = lookup_session(&headers, &state.registry);

    ws.on_upgrade(move |mut socket| async move {
        let Some(session) = session else {
            warn!("WebSocket opened without a session");
            let close = Message::Close(Some(CloseFrame {
                code: CLOSE_NO_SESSION,
                reason: "no session".into(),
            }));
            let _ = socket.send(close).await;
            return;
        };

        info!(session_id = %session.id(), "WebSocket session started");
        session
            .attach_channel(Box::new(WebSocketChannel::new(socket)))
            .await;

        let terminal = state.coordinator.start_or_join(&session).await;
        info!(
            session_id = %session.id(),
            failed = terminal.is_failure(),
            "WebSocket session finished"
        );
    })
}

/// A `ProgressChannel` over an upgraded socket
pub struct WebSocketChannel {
    socket: WebSocket,
}

impl WebSocketChannel {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl ProgressChannel for WebSocketChannel {
    async fn send(&mut self, progress: &Progress) -> Result<(), ChannelError> {
        let json = serde_json::to_string(progress).map_err(|e| ChannelError::Send(e.to_string()))?;

        self.socket
            .send(Message::Text(json))
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }

    async fn await_ack(&mut self) -> Result<(), ChannelError> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => return Ok(()),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket read failed");
                    return Err(ChannelError::Closed);
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.socket.send(Message::Close(None)).await;
    }
}
