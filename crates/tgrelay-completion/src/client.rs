use std::time::Duration;

use async_trait::async_trait;

use crate::error::CompletionError;

/// Sends one question to a completion service.
///
/// Implementations must honour `timeout` and report an elapsed deadline
/// as [`CompletionError::Timeout`], never as a generic failure.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Client name for logs.
    fn name(&self) -> &str;

    /// Ask `question` and return the raw response body.
    async fn answer_question(
        &self,
        question: &str,
        timeout: Duration,
    ) -> Result<String, CompletionError>;
}
