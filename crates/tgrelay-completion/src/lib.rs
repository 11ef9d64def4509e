//! Client for OpenAI-compatible chat completion APIs and the parser that
//! turns their raw JSON bodies into chat-ready texts.

pub mod client;
pub mod error;
pub mod openai;
pub mod response;

pub use client::CompletionClient;
pub use error::{CompletionError, ParseError};
pub use openai::OpenAiCompletionClient;
pub use response::{parse_completion, CompletionOutcome};
