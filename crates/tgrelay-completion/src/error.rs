/// Failure of a completion call.
///
/// `Timeout` is kept separate from everything else so callers can decide
/// to retry on it and only on it.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl CompletionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CompletionError::Timeout { .. })
    }
}

/// The raw body matched neither the success shape nor the error shape.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("could not decode completion response:\n{raw}\ncause: {source}")]
    Decode {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}
