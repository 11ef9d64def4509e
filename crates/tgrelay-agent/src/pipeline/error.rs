use tgrelay_completion::{CompletionError, ParseError};
use tgrelay_transcript::TranscriptError;

use crate::gateway::GatewayError;

/// Why a single update could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("storage: {0}")]
    Storage(#[from] TranscriptError),

    #[error("completion: {0}")]
    Completion(#[from] CompletionError),

    #[error("decode: {0}")]
    Decode(#[from] ParseError),

    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("completion timed out on all {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("processing cancelled")]
    Cancelled,
}

impl ProcessError {
    /// Deadline classification. The retry loop retries on this and
    /// nothing else.
    pub fn is_timeout(&self) -> bool {
        match self {
            ProcessError::Timeout { .. } => true,
            ProcessError::Completion(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Short error code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            ProcessError::Storage(_) => "STORAGE_ERROR",
            ProcessError::Completion(_) => "COMPLETION_ERROR",
            ProcessError::Decode(_) => "DECODE_ERROR",
            ProcessError::Gateway(_) => "GATEWAY_ERROR",
            ProcessError::Timeout { .. } => "TIMEOUT",
            ProcessError::Cancelled => "CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_timeout_is_classified_as_timeout() {
        let e = ProcessError::from(CompletionError::Timeout { ms: 10 });
        assert!(e.is_timeout());
        assert_eq!(e.code(), "COMPLETION_ERROR");
    }

    #[test]
    fn api_error_is_not_timeout() {
        let e = ProcessError::from(CompletionError::Api {
            status: 401,
            message: "bad key".into(),
        });
        assert!(!e.is_timeout());
    }

    #[test]
    fn exhausted_retries_is_timeout() {
        let e = ProcessError::Timeout { attempts: 3 };
        assert!(e.is_timeout());
        assert!(e.to_string().contains('3'));
    }

    #[test]
    fn storage_and_gateway_are_not_timeouts() {
        let storage = ProcessError::from(TranscriptError::UnexpectedRowCount { affected: 0 });
        let gateway = ProcessError::from(GatewayError::Timeout { ms: 5 });
        assert!(!storage.is_timeout());
        assert!(!gateway.is_timeout());
        assert!(!ProcessError::Cancelled.is_timeout());
    }
}
