//! Chat platform interface used by the pipeline.
//!
//! Implemented by `TelegramGateway` in `tgrelay-telegram`. Everything
//! platform-specific (keyboards, parse modes, chunking) stays behind it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use tgrelay_core::types::{BotCommandInfo, ChatMessage};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{op} failed: {reason}")]
    Request { op: &'static str, reason: String },

    #[error("command handler timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("update source already taken")]
    UpdatesTaken,
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Start receiving inbound messages. The channel closes when the
    /// platform source stops. Can be called once per gateway.
    async fn receive_updates(&self) -> Result<mpsc::Receiver<ChatMessage>, GatewayError>;

    /// Send plain text and return the message as the platform stored it.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<ChatMessage, GatewayError>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), GatewayError>;

    async fn delete_messages(&self, chat_id: i64, message_ids: &[i32]) -> Result<(), GatewayError>;

    /// Commands registered in the bot menu.
    async fn list_commands(&self) -> Result<Vec<BotCommandInfo>, GatewayError>;

    /// Run a registered command. `related` carries message ids the command
    /// may act on (restart deletes them). `None` means the command acted
    /// without replying.
    async fn handle_command(
        &self,
        message: &ChatMessage,
        related: &[i32],
    ) -> Result<Option<ChatMessage>, GatewayError>;
}
