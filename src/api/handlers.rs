use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{Credential, Progress};
use crate::search::{SearchRequest, SearchResults};
use crate::session::{Session, SessionRegistry};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Read the session token from the `Cookie` header(s)
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Resolve the caller's session, if any
pub fn lookup_session(headers: &HeaderMap, registry: &SessionRegistry) -> Option<Arc<Session>> {
    session_token(headers).and_then(|token| registry.get(token))
}

fn require_session(headers: &HeaderMap, state: &AppState) -> Result<Arc<Session>> {
    lookup_session(headers, &state.registry)
        .ok_or_else(|| AppError::Authorization("no session".to_string()))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    state.store.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        sessions: state.registry.len(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub sessions: usize,
}

/// Register a session for an access token obtained by the OAuth flow
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Response> {
    request.validate()?;

    let session = state.registry.register(Credential::new(request.access_token));
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        session.id()
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(format!("invalid session cookie: {}", e)))?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            session_id: session.id().to_string(),
        }),
    )
        .into_response())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 4096))]
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

/// Halt the caller's run, if any, and forget the session
pub async fn end_session(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    let session = require_session(&headers, &state)?;

    let halted = state.coordinator.halt(&session);
    state.registry.remove(session.id());
    info!(session_id = %session.id(), halted, "Session ended");

    Ok(StatusCode::NO_CONTENT)
}

/// Current progress snapshot of the caller's session
pub async fn get_progress(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Progress>> {
    let session = require_session(&headers, &state)?;
    Ok(Json(session.progress()))
}

/// Search the caller's indexed tracks
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: std::result::Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<SearchResults>> {
    let session = require_session(&headers, &state)?;
    let Query(request) = query.map_err(|e| AppError::Validation(e.body_text()))?;

    let results = state.search.search(&session, &request).await?;
    Ok(Json(results))
}

/// Prometheus exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}
