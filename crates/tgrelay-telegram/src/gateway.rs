//! Telegram implementation of [`ChatGateway`].
//!
//! Wraps a teloxide `Bot`. Updates arrive through a long-polling
//! `Dispatcher` that runs in its own task and forwards text messages into a
//! bounded channel, which the pipeline drains one message at a time.
//! The dispatcher runs a single worker, so the channel sees updates in the
//! order Telegram delivered them, across all chats.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::utils::command::BotCommands;
use teloxide::RequestError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tgrelay_agent::{ChatGateway, GatewayError};
use tgrelay_core::config::TelegramConfig;
use tgrelay_core::types::{BotCommandInfo, ChatMessage};

use crate::commands::{start_keyboard, Command, GREETING};
use crate::convert::{chat_message, inbound_message};
use crate::error::TelegramError;

/// Inbound messages buffered between the dispatcher and the pipeline.
const UPDATE_BUFFER: usize = 64;

/// Bot API limit for a single `deleteMessages` call.
const DELETE_CHUNK: usize = 100;

#[derive(Clone, Copy)]
struct DebugUpdates(bool);

/// Dispatcher distribution key. Every update maps to no key, which routes
/// all of them through the dispatcher's default worker in arrival order.
fn single_worker(_update: &Update) -> Option<Infallible> {
    None
}

pub struct TelegramGateway {
    bot: Bot,
    debug: bool,
    started: AtomicBool,
}

impl TelegramGateway {
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        if config.bot_token.is_empty() {
            return Err(TelegramError::NoToken);
        }
        Ok(Self {
            bot: Bot::new(&config.bot_token),
            debug: config.debug,
            started: AtomicBool::new(false),
        })
    }

    /// Publish the command menu.
    pub async fn register_commands(&self) -> Result<(), TelegramError> {
        self.bot.set_my_commands(Command::bot_commands()).await?;
        info!(commands = Command::bot_commands().len(), "Telegram: command menu registered");
        Ok(())
    }
}

fn api_error(op: &'static str) -> impl FnOnce(RequestError) -> GatewayError {
    move |e| TelegramError::from(e).into_gateway(op)
}

/// Dispatcher endpoint: forward one update into the pipeline channel.
async fn forward_message(
    msg: Message,
    tx: mpsc::Sender<ChatMessage>,
    debug_updates: DebugUpdates,
) -> ResponseResult<()> {
    if debug_updates.0 {
        debug!(update = ?msg, "raw update");
    }

    let Some(inbound) = inbound_message(&msg) else {
        return Ok(());
    };

    if tx.send(inbound).await.is_err() {
        warn!(
            chat_id = msg.chat.id.0,
            message_id = msg.id.0,
            "update channel closed, dropping message"
        );
    }
    Ok(())
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn receive_updates(&self) -> Result<mpsc::Receiver<ChatMessage>, GatewayError> {
        if self.started.load(Ordering::SeqCst) {
            return Err(GatewayError::UpdatesTaken);
        }
        self.register_commands()
            .await
            .map_err(|e| e.into_gateway("set_my_commands"))?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(GatewayError::UpdatesTaken);
        }

        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let bot = self.bot.clone();
        let debug_updates = DebugUpdates(self.debug);

        tokio::spawn(async move {
            info!("Telegram: starting long-polling dispatcher");
            let handler = Update::filter_message().endpoint(forward_message);

            Dispatcher::builder(bot, handler)
                .dependencies(dptree::deps![tx, debug_updates])
                .distribution_function(single_worker)
                .default_handler(|upd| async move {
                    debug!(update = ?upd, "ignoring non-message update");
                })
                .build()
                .dispatch()
                .await;

            // Dropping the dispatcher drops `tx` and closes the channel.
            warn!("Telegram dispatcher stopped");
        });

        Ok(rx)
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<ChatMessage, GatewayError> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(api_error("send_message"))?;
        Ok(chat_message(&sent))
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), GatewayError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(api_error("delete_message"))?;
        Ok(())
    }

    async fn delete_messages(&self, chat_id: i64, message_ids: &[i32]) -> Result<(), GatewayError> {
        for chunk in message_ids.chunks(DELETE_CHUNK) {
            let ids: Vec<MessageId> = chunk.iter().copied().map(MessageId).collect();
            self.bot
                .delete_messages(ChatId(chat_id), ids)
                .await
                .map_err(api_error("delete_messages"))?;
        }
        debug!(chat_id, count = message_ids.len(), "messages deleted");
        Ok(())
    }

    async fn list_commands(&self) -> Result<Vec<BotCommandInfo>, GatewayError> {
        let commands = self
            .bot
            .get_my_commands()
            .await
            .map_err(api_error("get_my_commands"))?;
        Ok(commands
            .into_iter()
            .map(|c| BotCommandInfo::new(c.command, c.description))
            .collect())
    }

    async fn handle_command(
        &self,
        message: &ChatMessage,
        related: &[i32],
    ) -> Result<Option<ChatMessage>, GatewayError> {
        let name = message.command().unwrap_or_default();
        let chat_id = message.chat_id;

        match Command::from_name(name) {
            Some(Command::Start) => {
                let sent = self
                    .bot
                    .send_message(ChatId(chat_id), GREETING)
                    .reply_markup(start_keyboard())
                    .await
                    .map_err(api_error("send_message"))?;
                Ok(Some(chat_message(&sent)))
            }
            Some(Command::Help) => self.send_text(chat_id, &Command::help_text()).await.map(Some),
            Some(Command::Restart) => {
                self.delete_messages(chat_id, related).await?;
                info!(chat_id, deleted = related.len(), "chat restarted");
                Ok(None)
            }
            None => Err(TelegramError::UnknownCommand(name.to_string()).into_gateway("handle_command")),
        }
    }
}
