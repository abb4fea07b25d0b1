//! Adapter for a locally running Ollama-compatible model server.

use crate::config::ConfigStore;
use crate::http_client::{HttpClient, TransportError};
use crate::llm_provider::{settle, ChatMessage, ChatProvider, ProviderFailure, ResponseFormat};
use crate::stream_reconciler::{ChunkStream, LocalChunk, WireChunk};
use async_trait::async_trait;
use futures_util::future;
use futures_util::stream::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_HOST: &str = "http://localhost:11434";

const BACKEND: &str = "Ollama";

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

pub struct LocalProvider {
    store: ConfigStore,
    http: Arc<dyn HttpClient>,
    host: String,
}

impl LocalProvider {
    /// Creates an adapter for the server at `OLLAMA_HOST` or the default
    /// local address.
    pub fn new(store: ConfigStore, http: Arc<dyn HttpClient>) -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::with_host(store, http, host)
    }

    pub fn with_host(
        store: ConfigStore,
        http: Arc<dyn HttpClient>,
        host: impl Into<String>,
    ) -> Self {
        let host = normalize_host(&host.into());
        Self { store, http, host }
    }

    /// Checks whether `model` is installed on the server.
    pub async fn model_exists(&self, model: &str) -> bool {
        let url = format!("{}/api/show", self.host);
        match self.http.post_json(&url, &[], &json!({ "model": model })).await {
            Ok(response) => response.is_success(),
            Err(err) => {
                warn!("Could not query model '{}': {}", model, err);
                false
            }
        }
    }

    fn model(&self) -> Result<String, ProviderFailure> {
        self.store
            .read()
            .map(|config| config.model)
            .map_err(|err| ProviderFailure::Config(err.to_string()))
    }

    fn request_body(
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
        stream: bool,
    ) -> Value {
        let mut body = json!({
            "model": model,
            "messages": messages,
            "stream": stream,
        });
        if format == ResponseFormat::Json {
            body["format"] = json!("json");
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
        let model = self.model()?;
        let url = format!("{}/api/chat", self.host);
        let body = Self::request_body(&model, messages, format, false);
        debug!("Sending {:?} chat request to {} with model {}", format, url, model);

        let response = self
            .http
            .post_json(&url, &[], &body)
            .await
            .map_err(classify_transport)?;

        if !response.is_success() {
            return Err(classify_status(&model, response.status, &response.body));
        }

        let reply: ChatReply =
            serde_json::from_str(&response.body).map_err(|err| ProviderFailure::MalformedResponse {
                backend: BACKEND,
                detail: err.to_string(),
            })?;
        Ok(reply.message.content.trim().to_string())
    }

    async fn open_stream(&self, messages: &[ChatMessage]) -> Result<ChunkStream, ProviderFailure> {
        if messages.is_empty() {
            return Err(ProviderFailure::EmptyConversation);
        }
        let model = self.model()?;
        let url = format!("{}/api/chat", self.host);
        let body = Self::request_body(&model, messages, ResponseFormat::Text, true);
        info!("Opening chat stream at {} with model {}", url, model);

        let response = self
            .http
            .post_json_stream(&url, &[], &body)
            .await
            .map_err(classify_transport)?;

        if !response.is_success() {
            let status = response.status;
            let body = response.collect_body().await;
            return Err(classify_status(&model, status, &body));
        }

        let chunks = response
            .lines
            .take_while(|line| {
                if let Err(err) = line {
                    warn!("Stream from {} interrupted: {}", BACKEND, err);
                }
                future::ready(line.is_ok())
            })
            .filter_map(|line| future::ready(line.ok().and_then(|l| parse_line(&l))))
            .boxed();
        Ok(chunks)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

fn parse_line(line: &str) -> Option<WireChunk> {
    if line.trim().is_empty() {
        return None;
    }
    if let Ok(reply) = serde_json::from_str::<ErrorReply>(line) {
        eprintln!("{} error: {}", BACKEND, reply.error);
        return None;
    }
    match serde_json::from_str::<LocalChunk>(line) {
        Ok(chunk) => Some(WireChunk::Local(chunk)),
        Err(err) => {
            warn!("Skipping unparseable stream line: {} ({})", line, err);
            None
        }
    }
}

fn classify_transport(err: TransportError) -> ProviderFailure {
    match err {
        TransportError::Connect(_) => ProviderFailure::Unreachable { backend: BACKEND },
        TransportError::Request(detail) => ProviderFailure::Transport(detail),
    }
}

fn classify_status(model: &str, status: u16, body: &str) -> ProviderFailure {
    let message = serde_json::from_str::<ErrorReply>(body)
        .map(|reply| reply.error)
        .unwrap_or_else(|_| body.trim().to_string());

    if message.contains("model") && message.contains("not found") {
        ProviderFailure::ModelNotFound {
            model: model.to_string(),
        }
    } else {
        ProviderFailure::Api {
            backend: BACKEND,
            status,
            message,
        }
    }
}

#[async_trait]
impl ChatProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
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
