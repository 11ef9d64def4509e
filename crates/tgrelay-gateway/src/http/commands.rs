//! GET /bot/commands: the command menu as the bot currently advertises it.
//!
//! Response: `{"commands": [{"command": "start", "description": "..."}]}`
//! Error:    `{"error": "..."}` with 500.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

use tgrelay_core::types::BotCommandInfo;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct CommandsReply {
    pub commands: Vec<BotCommandInfo>,
}

#[derive(Debug, Serialize)]
pub struct CommandsError {
    pub error: String,
}

pub async fn commands_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CommandsReply>, (StatusCode, Json<CommandsError>)> {
    match state.gateway.list_commands().await {
        Ok(commands) => Ok(Json(CommandsReply { commands })),
        Err(e) => {
            warn!(error = %e, "failed to list bot commands");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CommandsError {
                    error: e.to_string(),
                }),
            ))
        }
    }
}
