use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::text::{parse_command, truncate_chars, MAX_TRANSCRIPT_CHARS};

/// A chat message as seen by the pipeline: an inbound user update or a
/// message the bot has just sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub sender_id: i64,
    /// Sender username; empty when the platform has none.
    pub sender_name: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Command token if the text starts with `/name`.
    pub fn command(&self) -> Option<&str> {
        parse_command(&self.text)
    }

    /// Build the transcript row for this message, truncating the text.
    pub fn to_transcript(&self) -> TranscriptMessage {
        TranscriptMessage {
            chat_id: self.chat_id,
            message_id: self.message_id,
            sender_id: self.sender_id,
            sender_name: self.sender_name.clone(),
            text: truncate_chars(&self.text, MAX_TRANSCRIPT_CHARS),
            sent_at: self.sent_at,
        }
    }
}

/// Single persisted transcript row. `text` never exceeds
/// [`MAX_TRANSCRIPT_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub sender_id: i64,
    pub sender_name: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// A command registered in the bot's menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommandInfo {
    pub command: String,
    pub description: String,
}

impl BotCommandInfo {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}
