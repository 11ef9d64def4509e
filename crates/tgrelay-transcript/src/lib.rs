//! Chat transcript persistence: an append-only `messages` table plus a
//! `messages_archive` table that restart moves whole chats into.

pub mod db;
pub mod error;
pub mod store;

pub use error::TranscriptError;
pub use store::{SqliteTranscript, TranscriptStore};
