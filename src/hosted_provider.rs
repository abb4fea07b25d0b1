//! Adapter for a hosted OpenAI-compatible chat-completions API.

use crate::config::ConfigStore;
use crate::http_client::{HttpClient, TransportError};
use crate::llm_provider::{settle, ChatMessage, ChatProvider, ProviderFailure, ResponseFormat};
use crate::stream_reconciler::{ChunkStream, HostedChunk, WireChunk};
use async_trait::async_trait;
use futures_util::future;
use futures_util::stream::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const BACKEND: &str = "OpenAI";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct HostedProvider {
    store: ConfigStore,
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl HostedProvider {
    /// Creates an adapter for `OPENAI_BASE_URL` or the public endpoint.
    pub fn new(store: ConfigStore, http: Arc<dyn HttpClient>) -> Self {
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(store, http, base_url)
    }

    pub fn with_base_url(
        store: ConfigStore,
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            store,
            http,
            base_url,
        }
    }

    /// Model and credential, read fresh from the store on every call.
    fn credentials(&self) -> Result<(String, String), ProviderFailure> {
        let config = self
            .store
            .read()
            .map_err(|err| ProviderFailure::Config(err.to_string()))?;
        let api_key = config.api_key().ok_or(ProviderFailure::MissingApiKey)?;
        Ok((config.model, api_key))
    }

    fn completion_body(model: &str, messages: &[ChatMessage], format: ResponseFormat) -> Value {
        let mut body = json!({
            "model": model,
            "messages": messages,
            "temperature": 1,
            "max_tokens": 2048,
            "top_p": 1,
            "frequency_penalty": 0,
            "presence_penalty": 0,
        });
        if format == ResponseFormat::Json {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<String, ProviderFailure> {
        if messages.is_empty() {
            return Err(ProviderFailure::EmptyConversation);
        }
        let (model, api_key) = self.credentials()?;
        let url = format!("{}/chat/completions", self.base_url);
        let authorization = format!("Bearer {}", api_key);
        let body = Self::completion_body(&model, messages, format);
        debug!("Sending {:?} completion request to {} with model {}", format, url, model);

        let response = self
            .http
            .post_json(&url, &[("Authorization", authorization.as_str())], &body)
            .await
            .map_err(classify_transport)?;

        if !response.is_success() {
            return Err(classify_status(response.status, &response.body));
        }

        let reply: CompletionReply =
            serde_json::from_str(&response.body).map_err(|err| malformed(err.to_string()))?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| malformed("response carried no message content".to_string()))
    }

    async fn open_stream(&self, messages: &[ChatMessage]) -> Result<ChunkStream, ProviderFailure> {
        if messages.is_empty() {
            return Err(ProviderFailure::EmptyConversation);
        }
        let (model, api_key) = self.credentials()?;
        let url = format!("{}/chat/completions", self.base_url);
        let authorization = format!("Bearer {}", api_key);
        let body = json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });
        info!("Opening completion stream at {} with model {}", url, model);

        let response = self
            .http
            .post_json_stream(&url, &[("Authorization", authorization.as_str())], &body)
            .await
            .map_err(classify_transport)?;

        if !response.is_success() {
            let status = response.status;
            let body = response.collect_body().await;
            return Err(classify_status(status, &body));
        }

        let chunks = response
            .lines
            .take_while(|line| {
                let keep = match line {
                    Ok(text) => event_data(text) != Some(DONE_MARKER),
                    Err(err) => {
                        warn!("Stream from {} interrupted: {}", BACKEND, err);
                        false
                    }
                };
                future::ready(keep)
            })
            .filter_map(|line| future::ready(line.ok().and_then(|l| parse_event(&l))))
            .boxed();
        Ok(chunks)
    }
}

/// Payload of a server-sent `data:` line.
fn event_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

fn parse_event(line: &str) -> Option<WireChunk> {
    let data = event_data(line)?;
    if data.is_empty() {
        return None;
    }
    match serde_json::from_str::<HostedChunk>(data) {
        Ok(chunk) => Some(WireChunk::Hosted(chunk)),
        Err(err) => {
            warn!("Skipping unparseable stream event: {} ({})", data, err);
            None
        }
    }
}

fn malformed(detail: String) -> ProviderFailure {
    ProviderFailure::MalformedResponse {
        backend: BACKEND,
        detail,
    }
}

fn classify_transport(err: TransportError) -> ProviderFailure {
    match err {
        TransportError::Connect(_) => ProviderFailure::Unreachable { backend: BACKEND },
        TransportError::Request(detail) => ProviderFailure::Transport(detail),
    }
}

fn classify_status(status: u16, body: &str) -> ProviderFailure {
    let message = serde_json::from_str::<ErrorReply>(body)
        .map(|reply| reply.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    ProviderFailure::Api {
        backend: BACKEND,
        status,
        message,
    }
}

#[async_trait]
impl ChatProvider for HostedProvider {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Option<String> {
        settle(self.complete(messages, ResponseFormat::Text).await)
    }

    async fn chat_json(&self, messages: &[ChatMessage]) -> Option<String> {
        settle(self.complete(messages, ResponseFormat::Json).await)
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Option<ChunkStream> {
        settle(self.open_stream(messages).await)
    }
}
