//! Completion response shapes.
//!
//! A body is either a success (`choices[].message.content` + `usage`) or an
//! upstream error (`{"error": {"code", "message"}}`, some providers send the
//! inner object bare). Anything else is a decode failure.

use serde::Deserialize;

use crate::error::ParseError;

/// What a completion body turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// At least one choice came back. `contents` holds the non-empty ones.
    Answer {
        contents: Vec<String>,
        total_tokens: u64,
    },
    /// The provider refused: quota, rate limit, unavailable model.
    Upstream { code: String, message: String },
}

impl CompletionOutcome {
    /// Texts to send to the chat.
    ///
    /// An answer yields every content plus a trailing token-usage line;
    /// an upstream error yields `quota_notice` alone.
    pub fn into_texts(self, quota_notice: &str) -> Vec<String> {
        match self {
            CompletionOutcome::Answer {
                mut contents,
                total_tokens,
            } => {
                contents.push(spent_tokens_text(total_tokens));
                contents
            }
            CompletionOutcome::Upstream { .. } => vec![quota_notice.to_string()],
        }
    }
}

pub fn spent_tokens_text(total_tokens: u64) -> String {
    format!("spent {total_tokens} tokens")
}

/// Decode a raw completion body.
///
/// The success shape is tried first; an empty `choices` list falls through
/// to the error shape.
pub fn parse_completion(raw: &str) -> Result<CompletionOutcome, ParseError> {
    if let Ok(resp) = serde_json::from_str::<CompletionResponse>(raw) {
        if !resp.choices.is_empty() {
            let contents = resp
                .choices
                .into_iter()
                .filter_map(|c| c.message.content)
                .filter(|c| !c.is_empty())
                .collect();
            let total_tokens = resp.usage.map(|u| u.total_tokens).unwrap_or(0);
            return Ok(CompletionOutcome::Answer {
                contents,
                total_tokens,
            });
        }
    }

    match serde_json::from_str::<ErrorResponse>(raw) {
        Ok(err) => {
            let body = err.into_body();
            Ok(CompletionOutcome::Upstream {
                code: code_to_string(&body.code),
                message: body.message,
            })
        }
        Err(source) => Err(ParseError::Decode {
            raw: raw.to_string(),
            source,
        }),
    }
}

fn code_to_string(code: &serde_json::Value) -> String {
    match code {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// Response types (private, deserialization only)

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Wrapped { error: ErrorBody },
    Bare(ErrorBody),
}

impl ErrorResponse {
    fn into_body(self) -> ErrorBody {
        match self {
            ErrorResponse::Wrapped { error } => error,
            ErrorResponse::Bare(body) => body,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: serde_json::Value,
    message: String,
}
