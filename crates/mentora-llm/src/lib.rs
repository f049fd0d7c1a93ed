//! Mentora LLM Adapter
//!
//! A narrow interface to a remote text-completion service: one system
//! instruction, one user message, one reply, scoped by an opaque session key.
//!
//! [`HttpChatClient`] talks to an OpenAI-compatible chat-completions endpoint
//! with an explicit timeout and a bounded retry policy. [`ScriptedChatClient`]
//! replays canned replies for tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod http;
pub mod scripted;

pub use http::{ClientOptions, HttpChatClient, RetryPolicy};
pub use scripted::{RecordedCall, ScriptedChatClient};

/// A specialized `Result` type for LLM calls.
pub type Result<T> = std::result::Result<T, LlmError>;

/// One logical conversation with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    /// Opaque key scoping the conversation.
    pub session_id: String,
    /// Instruction text sent as the system message.
    pub system_message: String,
}

impl ChatSession {
    /// Creates a session with the given key and system instruction.
    #[must_use]
    pub fn new(session_id: impl Into<String>, system_message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            system_message: system_message.into(),
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends one user message within `session` and returns the reply text.
    async fn send_message(&self, session: &ChatSession, text: &str) -> Result<String>;
}

/// Errors returned by [`ChatClient`] implementations.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// The provider answered with a non-success HTTP status.
    #[error("LLM API error ({kind}): {message}")]
    Api {
        /// Classification derived from the status code.
        kind: LlmErrorKind,
        /// Status and response body.
        message: String,
    },

    /// No reply arrived within the configured timeout.
    #[error("LLM request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The request never reached the provider or the connection dropped.
    #[error("LLM network error: {0}")]
    Network(String),

    /// The provider replied, but the payload carried no usable text.
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),

    /// Anything else (client construction, exhausted test script).
    #[error("LLM error: {0}")]
    Other(String),
}

/// Categories of LLM failures for structured handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Authentication failure (invalid API key, expired credentials).
    Authentication,
    /// Rate limit exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues.
    Network,
    /// Request timed out.
    Timeout,
    /// Unusable reply payload.
    InvalidResponse,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::InvalidResponse => write!(f, "invalid_response"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl LlmErrorKind {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

impl LlmError {
    /// Creates an `Api` error from an HTTP status and response body.
    #[must_use]
    pub fn from_status(status: u16, body: impl AsRef<str>) -> Self {
        let body = body.as_ref().trim();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Self::Api {
            kind: LlmErrorKind::from_status(status),
            message,
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> LlmErrorKind {
        match self {
            Self::Api { kind, .. } => *kind,
            Self::Timeout(_) => LlmErrorKind::Timeout,
            Self::Network(_) => LlmErrorKind::Network,
            Self::InvalidResponse(_) => LlmErrorKind::InvalidResponse,
            Self::Other(_) => LlmErrorKind::Other,
        }
    }

    /// Returns `true` if this error is transient and may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            LlmErrorKind::RateLimit
                | LlmErrorKind::Server
                | LlmErrorKind::Network
                | LlmErrorKind::Timeout
        )
    }
}
