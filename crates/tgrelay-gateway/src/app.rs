use std::sync::Arc;
use std::time::Instant;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use tgrelay_agent::ChatGateway;
use tgrelay_transcript::SqliteTranscript;

/// Shared state handed to every Axum handler.
pub struct AppState {
    pub gateway: Arc<dyn ChatGateway>,
    pub transcript: Arc<SqliteTranscript>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Arc<dyn ChatGateway>, transcript: Arc<SqliteTranscript>) -> Self {
        Self {
            gateway,
            transcript,
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/bot/commands", get(crate::http::commands::commands_handler))
        .route(
            "/chats/{chat_id}/history",
            get(crate::http::history::history_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Empty in-memory transcript for handler tests.
#[cfg(test)]
pub(crate) fn memory_transcript() -> Arc<SqliteTranscript> {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    tgrelay_transcript::db::init_db(&conn).unwrap();
    Arc::new(SqliteTranscript::new(conn, std::time::Duration::from_millis(500)).unwrap())
}
