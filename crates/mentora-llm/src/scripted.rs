//! Deterministic [`ChatClient`] for tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{ChatClient, ChatSession, LlmError, Result};

/// One call observed by a [`ScriptedChatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Session key the caller used.
    pub session_id: String,
    /// System instruction the caller sent.
    pub system_message: String,
    /// User message the caller sent.
    pub text: String,
}

/// Replays queued replies in order.
///
/// When a single reply remains it is returned for every further call, so a
/// client built with one reply behaves like a fixed-response provider.
#[derive(Debug, Default)]
pub struct ScriptedChatClient {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedChatClient {
    /// Creates a client with the given replies.
    #[must_use]
    pub fn new(replies: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a client that always replies with `text`.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new([Ok(text.into())])
    }

    /// Creates a client that always fails with `error`.
    #[must_use]
    pub fn failing(error: LlmError) -> Self {
        Self::new([Err(error)])
    }

    /// Queues another reply.
    pub fn push_reply(&self, reply: Result<String>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// All calls observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls observed so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_reply(&self) -> Result<String> {
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        match replies.len() {
            0 => Err(LlmError::Other("no scripted replies left".to_string())),
            1 => replies
                .front()
                .cloned()
                .unwrap_or_else(|| Err(LlmError::Other("no scripted replies left".to_string()))),
            _ => replies
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Other("no scripted replies left".to_string()))),
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn send_message(&self, session: &ChatSession, text: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                session_id: session.session_id.clone(),
                system_message: session.system_message.clone(),
                text: text.to_string(),
            });
        self.next_reply()
    }
}
