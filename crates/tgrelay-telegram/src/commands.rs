//! Bot command menu and the start keyboard.

use teloxide::types::{KeyboardButton, KeyboardMarkup};
use teloxide::utils::command::BotCommands;

pub const GREETING: &str = "Hi! Ask me anything, or pick an option below.";
pub const CHECK_SUBSCRIPTION: &str = "Check subscription";
pub const AVAILABLE_CHATS: &str = "Available chats";
pub const KEYBOARD_PLACEHOLDER: &str = "Choose an option";

/// Commands registered in the bot menu with `set_my_commands`.
#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "show this text")]
    Help,
    #[command(description = "clear this chat and start over")]
    Restart,
}

impl Command {
    /// Look up a command by its bare name (no slash, no `@bot` suffix).
    /// Case-sensitive, like the menu Telegram shows.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "restart" => Some(Command::Restart),
            _ => None,
        }
    }

    pub fn help_text() -> String {
        Self::descriptions().to_string()
    }
}

/// One-time reply keyboard sent with the `/start` greeting.
pub fn start_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(CHECK_SUBSCRIPTION),
        KeyboardButton::new(AVAILABLE_CHATS),
    ]])
    .one_time_keyboard()
    .resize_keyboard()
    .input_field_placeholder(KEYBOARD_PLACEHOLDER)
}
