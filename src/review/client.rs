// SPDX-License-Identifier: MIT
//! Groq chat-completion client.
//!
//! One synchronous-looking call per review: build the prompt, POST it,
//! return the first completion choice's text unparsed. Failures map onto a
//! small taxonomy the endpoint converts to HTTP error payloads; nothing
//! here retries — the user retries by committing again.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ReviewerConfig;
use crate::review::prompt;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);
const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 2048;

/// Errors from a single review attempt.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Groq API key not configured. Set groq_api_key in config.toml or the GROQ_API_KEY environment variable")]
    MissingCredentials,
    #[error("review request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,
    #[error("could not reach the Groq API: {0}")]
    Network(String),
    #[error("Groq API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("review request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Groq API returned a completion with no choices")]
    MalformedResponse,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Shape of a Groq error body: `{"error":{"message":"...","type":"..."}}`.
#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(config: &ReviewerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: config.groq_api_key.clone(),
            model: config.model.clone(),
            base_url: config.groq_api_url.clone(),
        }
    }

    /// Send `diff` for review and return the raw completion text.
    ///
    /// Fails fast with [`ReviewError::MissingCredentials`] before any
    /// network I/O when no API key is configured.
    pub async fn review(&self, diff: &str) -> Result<String, ReviewError> {
        if self.api_key.is_empty() {
            return Err(ReviewError::MissingCredentials);
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt::build_prompt(diff),
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = %self.model, diff_bytes = diff.len(), "sending review request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let completion: ChatResponse = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(ReviewError::MalformedResponse)?;
        Ok(choice.message.content)
    }
}

fn classify_transport_error(e: reqwest::Error) -> ReviewError {
    if e.is_timeout() {
        ReviewError::Timeout
    } else if e.is_connect() {
        ReviewError::Network(e.to_string())
    } else {
        ReviewError::RequestFailed(e)
    }
}

/// Pull the human-readable message out of a Groq error body, falling back
/// to the raw (truncated) body text.
fn api_error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = parsed.error.and_then(|e| e.message) {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(500).collect()
    }
}
