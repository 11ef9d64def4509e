//! Completion call, response parsing, retry on timeout, delivery.

use std::time::Instant;

use tracing::{info, warn};

use tgrelay_completion::{parse_completion, CompletionOutcome};

use super::error::ProcessError;
use super::processor::MessageProcessor;

impl MessageProcessor {
    /// Ask the completion service and turn the body into chat texts.
    ///
    /// One call, bounded by the configured completion timeout.
    pub async fn answer(&self, question: &str) -> Result<Vec<String>, ProcessError> {
        let started = Instant::now();
        let raw = self
            .client
            .answer_question(question, self.settings.completion_timeout)
            .await?;

        let outcome = parse_completion(&raw)?;
        if let CompletionOutcome::Upstream { code, message } = &outcome {
            warn!(
                client = self.client.name(),
                code = %code,
                message = %message,
                "completion provider refused the request"
            );
        }

        let texts = outcome.into_texts(&self.settings.notices.quota);
        info!(
            client = self.client.name(),
            texts = texts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "completion answered"
        );
        Ok(texts)
    }

    /// [`answer`](Self::answer) with up to `max_retries` extra attempts.
    ///
    /// Only a timeout is retried. Any other error returns immediately.
    /// Exhausting every attempt yields [`ProcessError::Timeout`].
    pub async fn answer_with_retry(&self, question: &str) -> Result<Vec<String>, ProcessError> {
        let attempts = self.settings.max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            match self.answer(question).await {
                Ok(texts) => {
                    if attempt > 1 {
                        info!(attempt, "completion succeeded after retry");
                    }
                    return Ok(texts);
                }
                Err(e) if e.is_timeout() => {
                    warn!(attempt, attempts, error = %e, "completion attempt timed out");
                    if attempt < attempts && !self.settings.retry_delay.is_zero() {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProcessError::Timeout { attempts })
    }

    /// Send and persist each text in order. The first failure stops the rest.
    pub(crate) async fn deliver(&self, chat_id: i64, texts: &[String]) -> Result<usize, ProcessError> {
        for text in texts {
            self.send_and_save(chat_id, text).await?;
        }
        Ok(texts.len())
    }
}
