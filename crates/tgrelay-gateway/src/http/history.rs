//! GET /chats/{chat_id}/history?limit=N: recent transcript rows of a chat.
//!
//! Response: `{"chat_id": 1, "messages": [...]}`, oldest first.
//! Error:    `{"error": "..."}` with 500.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tgrelay_core::types::TranscriptMessage;

use crate::app::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryReply {
    pub chat_id: i64,
    pub messages: Vec<TranscriptMessage>,
}

#[derive(Debug, Serialize)]
pub struct HistoryError {
    pub error: String,
}

pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryReply>, (StatusCode, Json<HistoryError>)> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    match state.transcript.history(chat_id, limit) {
        Ok(messages) => Ok(Json(HistoryReply { chat_id, messages })),
        Err(e) => {
            warn!(chat_id, error = %e, "failed to read chat history");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HistoryError {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use tgrelay_transcript::TranscriptStore;

    use crate::app::memory_transcript;
    use crate::http::commands::tests::MenuGateway;

    fn row(chat_id: i64, message_id: i32) -> TranscriptMessage {
        TranscriptMessage {
            chat_id,
            message_id,
            sender_id: 42,
            sender_name: "alice".into(),
            text: format!("message {message_id}"),
            sent_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    async fn state_with_rows(chat_id: i64, count: i32) -> Arc<AppState> {
        let transcript = memory_transcript();
        for id in 1..=count {
            transcript.save(&row(chat_id, id)).await.unwrap();
        }
        Arc::new(AppState::new(Arc::new(MenuGateway { fail: false }), transcript))
    }

    #[tokio::test]
    async fn returns_rows_oldest_first() {
        let state = state_with_rows(7, 3).await;
        let Json(reply) = history_handler(State(state), Path(7), Query(HistoryQuery { limit: None }))
            .await
            .unwrap();
        assert_eq!(reply.chat_id, 7);
        let ids: Vec<i32> = reply.messages.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(reply.messages[0], row(7, 1));
    }

    #[tokio::test]
    async fn limit_keeps_the_most_recent_rows() {
        let state = state_with_rows(7, 5).await;
        let Json(reply) =
            history_handler(State(state), Path(7), Query(HistoryQuery { limit: Some(2) }))
                .await
                .unwrap();
        let ids: Vec<i32> = reply.messages.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[tokio::test]
    async fn unknown_chat_is_empty() {
        let state = state_with_rows(7, 2).await;
        let Json(reply) = history_handler(State(state), Path(8), Query(HistoryQuery { limit: None }))
            .await
            .unwrap();
        assert!(reply.messages.is_empty());
    }

    #[tokio::test]
    async fn unreadable_row_is_500() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        tgrelay_transcript::db::init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO messages
             (chat_id, message_id, from_id, from_username, text, time_stamp, db_time_stamp)
             VALUES (7, 1, 42, 'alice', 'hi', 'not a date', 'now')",
            [],
        )
        .unwrap();
        let transcript = Arc::new(
            tgrelay_transcript::SqliteTranscript::new(conn, std::time::Duration::from_millis(500))
                .unwrap(),
        );
        let state = Arc::new(AppState::new(Arc::new(MenuGateway { fail: false }), transcript));

        let Err((status, Json(body))) =
            history_handler(State(state), Path(7), Query(HistoryQuery { limit: None })).await
        else {
            panic!("expected an error reply");
        };
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.error.contains("not a date"));
    }
}
