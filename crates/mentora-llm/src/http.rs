//! OpenAI-compatible HTTP chat client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{ChatClient, ChatSession, LlmError, Result};

/// How many times, and how patiently, transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one. Zero disables retrying.
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `n * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(500),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

/// Connection settings for [`HttpChatClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL, e.g. `https://api.openai.com`.
    pub endpoint: String,
    /// Model name sent with every request.
    pub model: String,
    /// Bearer token, if the provider requires one.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    user: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat client for `POST {endpoint}/v1/chat/completions`.
///
/// The session key is forwarded as the provider's `user` field. No
/// transcript is kept between calls.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    options: ClientOptions,
    client: reqwest::Client,
}

impl HttpChatClient {
    /// Builds a client with the given options.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Other` if the underlying HTTP client cannot be built.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { options, client })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.options.endpoint.trim_end_matches('/')
        )
    }

    async fn send_once(&self, session: &ChatSession, text: &str) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.options.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &session.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            user: &session.session_id,
        };

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(api_key) = &self.options.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), detail));
        }

        let payload: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error()
            } else {
                LlmError::InvalidResponse(format!("unreadable completion payload: {e}"))
            }
        })?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("completion contained no text".to_string()))
    }

    fn transport_error(&self, e: &reqwest::Error) -> LlmError {
        if e.is_timeout() {
            self.timeout_error()
        } else {
            LlmError::Network(e.to_string())
        }
    }

    const fn timeout_error(&self) -> LlmError {
        LlmError::Timeout(self.options.timeout)
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn send_message(&self, session: &ChatSession, text: &str) -> Result<String> {
        let retry = self.options.retry;
        let mut attempt = 0;

        loop {
            debug!(
                session = %session.session_id,
                attempt,
                message_len = text.len(),
                "Sending chat completion request"
            );

            match self.send_once(session, text).await {
                Ok(reply) => {
                    debug!(
                        session = %session.session_id,
                        reply_len = reply.len(),
                        "Chat completion received"
                    );
                    return Ok(reply);
                }
                Err(e) if e.is_transient() && attempt < retry.max_retries => {
                    attempt += 1;
                    let delay = retry.delay_for(attempt);
                    warn!(
                        session = %session.session_id,
                        error = %e,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Transient LLM failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
