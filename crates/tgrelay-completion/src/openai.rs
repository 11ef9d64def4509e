use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use tgrelay_core::config::CompletionConfig;

use crate::client::CompletionClient;
use crate::error::CompletionError;

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn from_config(config: &CompletionConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
        )
    }

    async fn post(&self, question: &str, timeout: Duration) -> Result<String, CompletionError> {
        let body = build_request_body(&self.model, question);
        let url = format!("{}/chat/completions", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| classify(e, timeout))?;

        if resp_is_success(status) {
            return Ok(text);
        }

        // Quota and billing refusals carry the error shape the parser
        // turns into a user notice; hand them through untouched.
        if (status == 429 || status == 402) && !text.trim().is_empty() {
            warn!(status, "completion quota refusal");
            return Ok(text);
        }

        warn!(status, body = %text, "completion API error");
        Err(CompletionError::Api {
            status,
            message: text,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn answer_question(
        &self,
        question: &str,
        timeout: Duration,
    ) -> Result<String, CompletionError> {
        debug!(model = %self.model, len = question.len(), "sending completion request");

        // reqwest's timeout covers the request; the outer deadline also
        // covers DNS and body streaming stalls.
        match tokio::time::timeout(timeout, self.post(question, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout {
                ms: timeout.as_millis() as u64,
            }),
        }
    }
}

fn build_request_body(model: &str, question: &str) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [
            { "role": "user", "content": question }
        ],
    })
}

fn resp_is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn classify(err: reqwest::Error, timeout: Duration) -> CompletionError {
    if err.is_timeout() {
        CompletionError::Timeout {
            ms: timeout.as_millis() as u64,
        }
    } else {
        CompletionError::Http(err)
    }
}
