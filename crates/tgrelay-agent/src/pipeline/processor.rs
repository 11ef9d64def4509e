use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use tgrelay_completion::CompletionClient;
use tgrelay_core::config::{NoticesConfig, RelayConfig};
use tgrelay_core::types::ChatMessage;
use tgrelay_transcript::TranscriptStore;

use crate::gateway::{ChatGateway, GatewayError};

use super::error::ProcessError;

/// Command that hands the chat's stored message ids to its handler.
pub const RESTART_COMMAND: &str = "restart";

/// Pipeline knobs, taken from [`RelayConfig`] once at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub completion_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub command_timeout: Duration,
    pub reply_unknown: bool,
    pub archive_on_silent: bool,
    pub notices: NoticesConfig,
}

impl PipelineSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            completion_timeout: Duration::from_secs(config.completion.timeout_secs),
            max_retries: config.completion.max_retries,
            retry_delay: Duration::from_millis(config.completion.retry_delay_ms),
            command_timeout: Duration::from_secs(config.commands.timeout_secs),
            reply_unknown: config.commands.reply_unknown,
            archive_on_silent: config.commands.archive_on_silent,
            notices: config.notices.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// How an update was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A registered command ran.
    Command { replied: bool, archived: bool },
    /// The command is not in the bot menu.
    UnknownCommand,
    /// A question was answered with `texts` outbound messages.
    Answered { texts: usize },
}

/// Processes inbound messages one at a time.
///
/// Holds no per-update state; everything an update needs lives on the
/// stack of [`MessageProcessor::process`].
pub struct MessageProcessor {
    pub(crate) gateway: Arc<dyn ChatGateway>,
    pub(crate) store: Arc<dyn TranscriptStore>,
    pub(crate) client: Arc<dyn CompletionClient>,
    pub(crate) settings: PipelineSettings,
}

impl MessageProcessor {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        store: Arc<dyn TranscriptStore>,
        client: Arc<dyn CompletionClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            client,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Handle one inbound message.
    ///
    /// Steps:
    /// 1. Persist the inbound message (storage faults abort, no retry).
    /// 2. Commands go to the gateway's handler.
    /// 3. Free text gets a placeholder, a completion with bounded retry,
    ///    the answer texts, and the placeholder removed.
    pub async fn process(&self, msg: &ChatMessage) -> Result<Outcome, ProcessError> {
        self.store.save(&msg.to_transcript()).await?;
        debug!(
            chat_id = msg.chat_id,
            message_id = msg.message_id,
            sender = %msg.sender_name,
            "inbound message saved"
        );

        match msg.command() {
            Some(command) => self.process_command(msg, command).await,
            None => self.process_question(msg).await,
        }
    }

    async fn process_command(
        &self,
        msg: &ChatMessage,
        command: &str,
    ) -> Result<Outcome, ProcessError> {
        let registered = self.gateway.list_commands().await?;
        if !registered.iter().any(|c| c.command == command) {
            info!(chat_id = msg.chat_id, command, "unknown command");
            if self.settings.reply_unknown {
                let notice = if registered.is_empty() {
                    &self.settings.notices.no_commands
                } else {
                    &self.settings.notices.unknown_command
                };
                self.send_and_save(msg.chat_id, notice).await?;
            }
            return Ok(Outcome::UnknownCommand);
        }

        let related = if command == RESTART_COMMAND {
            self.store.message_ids(msg.chat_id).await?
        } else {
            Vec::new()
        };

        let timeout = self.settings.command_timeout;
        let reply = tokio::time::timeout(timeout, self.gateway.handle_command(msg, &related))
            .await
            .map_err(|_| GatewayError::Timeout {
                ms: timeout.as_millis() as u64,
            })??;

        match reply {
            None => {
                let archived = if self.settings.archive_on_silent {
                    self.store.move_to_archive(msg.chat_id).await?
                } else {
                    false
                };
                info!(
                    chat_id = msg.chat_id,
                    command,
                    related = related.len(),
                    archived,
                    "command handled without reply"
                );
                Ok(Outcome::Command {
                    replied: false,
                    archived,
                })
            }
            Some(reply) => {
                self.store.save(&reply.to_transcript()).await?;
                info!(chat_id = msg.chat_id, command, "command replied");
                Ok(Outcome::Command {
                    replied: true,
                    archived: false,
                })
            }
        }
    }

    async fn process_question(&self, msg: &ChatMessage) -> Result<Outcome, ProcessError> {
        let placeholder = self
            .send_and_save(msg.chat_id, &self.settings.notices.placeholder)
            .await?;

        let result = self.answer_and_deliver(msg).await;
        self.discard_placeholder(&placeholder).await;
        result
    }

    async fn answer_and_deliver(&self, msg: &ChatMessage) -> Result<Outcome, ProcessError> {
        let texts = match self.answer_with_retry(&msg.text).await {
            Ok(texts) => texts,
            Err(ProcessError::Timeout { attempts }) => {
                self.send_and_save(msg.chat_id, &self.settings.notices.timeout)
                    .await?;
                return Err(ProcessError::Timeout { attempts });
            }
            Err(e) => return Err(e),
        };

        let sent = self.deliver(msg.chat_id, &texts).await?;
        debug!(chat_id = msg.chat_id, message_id = msg.message_id, sent, "answer delivered");
        Ok(Outcome::Answered { texts: sent })
    }

    /// Delete the placeholder. The answer is already out, so a failure is
    /// only logged.
    async fn discard_placeholder(&self, placeholder: &ChatMessage) {
        if let Err(e) = self
            .gateway
            .delete_message(placeholder.chat_id, placeholder.message_id)
            .await
        {
            warn!(
                chat_id = placeholder.chat_id,
                message_id = placeholder.message_id,
                error = %e,
                "failed to delete placeholder"
            );
        }
    }

    /// Send `text` and persist what the platform returned.
    pub(crate) async fn send_and_save(
        &self,
        chat_id: i64,
        text: &str,
    ) -> Result<ChatMessage, ProcessError> {
        let sent = self.gateway.send_text(chat_id, text).await?;
        self.store.save(&sent.to_transcript()).await?;
        debug!(chat_id, message_id = sent.message_id, "message sent and saved");
        Ok(sent)
    }
}
