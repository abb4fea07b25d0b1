//! Turns either backend's streaming chunks into plain text fragments.
//!
//! The local backend puts each delta at `message.content`; the hosted
//! backend puts it at `choices[0].delta.content`. This is the only module
//! that knows about those shapes.

use crate::llm_provider::{ChatMessage, ChatProvider};
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use tracing::debug;

/// One line of the local backend's NDJSON stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalChunk {
    #[serde(default)]
    pub message: LocalMessage,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalMessage {
    #[serde(default)]
    pub content: String,
}

/// One `data:` event of the hosted backend's stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostedChunk {
    #[serde(default)]
    pub choices: Vec<HostedChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostedChoice {
    #[serde(default)]
    pub delta: HostedDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostedDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// A streaming chunk in its backend's native shape.
#[derive(Debug, Clone)]
pub enum WireChunk {
    Local(LocalChunk),
    Hosted(HostedChunk),
}

impl WireChunk {
    pub fn local(content: &str) -> Self {
        WireChunk::Local(LocalChunk {
            message: LocalMessage {
                content: content.to_string(),
            },
            done: false,
        })
    }

    pub fn hosted(content: Option<&str>) -> Self {
        WireChunk::Hosted(HostedChunk {
            choices: vec![HostedChoice {
                delta: HostedDelta {
                    content: content.map(str::to_string),
                },
            }],
        })
    }

    /// The text delta carried by this chunk; empty when there is none.
    pub fn into_fragment(self) -> String {
        match self {
            WireChunk::Local(chunk) => chunk.message.content,
            WireChunk::Hosted(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .unwrap_or_default(),
        }
    }
}

/// Lazy stream of backend chunks, consumed once.
pub type ChunkStream = BoxStream<'static, WireChunk>;

/// Asks `question` and returns the answer as a stream of text fragments.
///
/// Fragments arrive in backend order. If the stream cannot be opened the
/// failure has already been reported and the returned stream is empty.
pub async fn stream_answer(
    provider: &dyn ChatProvider,
    question: &str,
) -> BoxStream<'static, String> {
    let messages = [ChatMessage::user(question)];
    match provider.chat_stream(&messages).await {
        Some(chunks) => {
            debug!("Streaming answer from {}", provider.name());
            chunks.map(WireChunk::into_fragment).boxed()
        }
        None => stream::empty().boxed(),
    }
}
