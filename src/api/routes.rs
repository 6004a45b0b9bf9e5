use crate::api::{handlers, websocket, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route(
            "/api/session",
            post(handlers::create_session).delete(handlers::end_session),
        )
        .route("/api/progress", get(handlers::get_progress))
        .route("/api/search", get(handlers::search))
        // Progress streaming
        .route("/ws", get(websocket::websocket_handler));

    if state.metrics_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
