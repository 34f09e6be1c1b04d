//! HTTP surface: landing page, WebSocket upgrade and the read-only API.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chatline_protocol::{Message, Session};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::connection::ws_handler;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub session_id: Option<String>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/ws", get(ws_handler))
        .route("/api/sessions", get(sessions_handler))
        .route("/api/messages", get(messages_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /api/sessions
async fn sessions_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Session>> {
    Json(state.sessions().await)
}

/// GET /api/messages?session_id={id}
/// Missing or empty `session_id` is a 400 with no body.
async fn messages_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)?;
    Ok(Json(state.history(&session_id).await))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
