//! The update-consumption loop.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tgrelay_core::types::ChatMessage;

use super::error::ProcessError;
use super::processor::MessageProcessor;

impl MessageProcessor {
    /// Take the gateway's update stream and process it until it closes or
    /// `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ProcessError> {
        let updates = self.gateway.receive_updates().await?;
        info!("waiting for incoming messages");
        self.consume(updates, cancel).await
    }

    /// Process `updates` one at a time, in order.
    ///
    /// Returns `Ok(())` when the channel closes and
    /// `Err(ProcessError::Cancelled)` as soon as `cancel` fires, abandoning
    /// the in-flight update without undoing what it already sent or saved.
    /// A failed update is logged, the user is told, and the loop goes on.
    pub async fn consume(
        &self,
        mut updates: mpsc::Receiver<ChatMessage>,
        cancel: CancellationToken,
    ) -> Result<(), ProcessError> {
        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("consumer cancelled");
                    return Err(ProcessError::Cancelled);
                }
                update = updates.recv() => match update {
                    Some(msg) => msg,
                    None => {
                        warn!("update channel closed");
                        return Ok(());
                    }
                },
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(chat_id = msg.chat_id, message_id = msg.message_id, "consumer cancelled mid-update");
                    return Err(ProcessError::Cancelled);
                }
                result = self.process(&msg) => result,
            };

            match result {
                Ok(outcome) => {
                    debug!(chat_id = msg.chat_id, message_id = msg.message_id, ?outcome, "update processed");
                }
                Err(e) => {
                    error!(
                        chat_id = msg.chat_id,
                        message_id = msg.message_id,
                        code = e.code(),
                        error = %e,
                        "failed to process update"
                    );
                    // The timeout path has already told the user.
                    if !e.is_timeout() {
                        self.notify_failure(msg.chat_id).await;
                    }
                }
            }
        }
    }

    /// Best-effort generic failure notice.
    async fn notify_failure(&self, chat_id: i64) {
        if let Err(e) = self
            .send_and_save(chat_id, &self.settings.notices.failure)
            .await
        {
            warn!(chat_id, error = %e, "failed to send failure notice");
        }
    }
}
