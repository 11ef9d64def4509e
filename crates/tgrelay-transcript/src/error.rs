use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// `save` must write exactly one row; anything else is a fault.
    #[error("expected 1 row affected, got {affected}")]
    UnexpectedRowCount { affected: usize },

    #[error("invalid stored timestamp {value:?}: {reason}")]
    BadTimestamp { value: String, reason: String },

    #[error("transcript connection lock poisoned")]
    Poisoned,
}
