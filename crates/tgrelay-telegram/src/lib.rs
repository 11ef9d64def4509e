pub mod commands;
pub mod convert;
pub mod error;
pub mod gateway;

pub use commands::Command;
pub use error::TelegramError;
pub use gateway::TelegramGateway;
