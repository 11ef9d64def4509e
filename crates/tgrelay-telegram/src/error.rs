use tgrelay_agent::GatewayError;

/// Errors produced by the Telegram gateway.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("no bot token configured")]
    NoToken,

    #[error("no handler for command /{0}")]
    UnknownCommand(String),
}

impl TelegramError {
    /// Flatten into the pipeline's gateway error, tagged with the Bot API
    /// method that failed.
    pub fn into_gateway(self, op: &'static str) -> GatewayError {
        GatewayError::Request {
            op,
            reason: self.to_string(),
        }
    }
}
