//! The provider contract shared by every model-serving backend.
//!
//! Classifier, resolver and stream reconciler only ever see a
//! [`ChatProvider`]. Each backend translates its own failures into a
//! [`ProviderFailure`], reports it once through [`settle`], and hands the
//! caller `None`. No provider error crosses this boundary.

use crate::stream_reconciler::{ChunkStream, WireChunk};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// How the backend is asked to shape its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

/// Why a provider call produced nothing.
#[derive(Debug, Clone, Error)]
pub enum ProviderFailure {
    #[error("{backend} is not running or cannot be reached.")]
    Unreachable { backend: &'static str },

    #[error("The model \"{model}\" is not installed. Please install this model before using it.")]
    ModelNotFound { model: String },

    #[error("No API key configured. Set one with: jarvis --api-key <key>")]
    MissingApiKey,

    #[error("{backend} returned status {status}: {message}")]
    Api {
        backend: &'static str,
        status: u16,
        message: String,
    },

    #[error("Error processing the request: {0}")]
    Transport(String),

    #[error("Unexpected response from {backend}: {detail}")]
    MalformedResponse {
        backend: &'static str,
        detail: String,
    },

    #[error("Could not read configuration: {0}")]
    Config(String),

    #[error("Cannot send an empty conversation")]
    EmptyConversation,
}

/// Reports a failed provider call to the user and collapses it to `None`.
pub fn settle<T>(result: Result<T, ProviderFailure>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(failure) => {
            warn!("Provider call failed: {:?}", failure);
            eprintln!("{}", failure);
            None
        }
    }
}

/// Uniform chat contract over the model-serving backends.
///
/// All three operations return `None` after a failure has already been
/// reported; callers only check for the sentinel.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Single-shot request returning trimmed plain text.
    async fn chat(&self, messages: &[ChatMessage]) -> Option<String>;

    /// Single-shot request with the backend constrained to one JSON object.
    async fn chat_json(&self, messages: &[ChatMessage]) -> Option<String>;

    /// Opens a streaming response.
    async fn chat_stream(&self, messages: &[ChatMessage]) -> Option<ChunkStream>;
}

/// In-memory provider that replays canned replies.
///
/// Each `chat`/`chat_json` call pops the next queued reply; an exhausted
/// queue behaves like a failed call. Every conversation sent is recorded so
/// tests can inspect the prompts.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Option<String>>>,
    chunks: Mutex<Option<Vec<WireChunk>>>,
    sent: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply; `None` simulates an unreachable backend.
    pub fn with_reply(self, reply: Option<&str>) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply.map(str::to_string));
        self
    }

    /// Sets the chunks the next `chat_stream` call yields.
    pub fn with_stream(self, chunks: Vec<WireChunk>) -> Self {
        *self.chunks.lock().unwrap_or_else(|e| e.into_inner()) = Some(chunks);
        self
    }

    /// Conversations received so far, in call order.
    pub fn sent(&self) -> Vec<Vec<ChatMessage>> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, messages: &[ChatMessage]) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());
    }

    fn next_reply(&self, messages: &[ChatMessage]) -> Option<String> {
        self.record(messages);
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .flatten()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Option<String> {
        self.next_reply(messages)
    }

    async fn chat_json(&self, messages: &[ChatMessage]) -> Option<String> {
        self.next_reply(messages)
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Option<ChunkStream> {
        self.record(messages);
        let chunks = self.chunks.lock().unwrap_or_else(|e| e.into_inner()).take()?;
        Some(stream::iter(chunks).boxed())
    }
}
