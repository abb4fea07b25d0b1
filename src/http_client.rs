//! HTTP client abstraction for the model-serving backends.
//!
//! This module provides a trait-based abstraction over HTTP clients, enabling
//! dependency injection and easy mocking in tests. Streaming responses are
//! exposed as a stream of text lines, which is the framing both backends use
//! (newline-delimited JSON and server-sent events).

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use thiserror::Error;

/// Failure to talk to the remote end at all.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Nothing is listening at the target address.
    #[error("connection refused: {0}")]
    Connect(String),

    /// Any other request or body-read failure.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Lines of a response body, without their terminators.
pub type LineStream = BoxStream<'static, Result<String, TransportError>>;

/// A response whose body is read lazily, one line at a time.
pub struct StreamingResponse {
    pub status: u16,
    pub lines: LineStream,
}

impl StreamingResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drains the remaining body into a single string.
    ///
    /// Used on error statuses, where the body is a small error document.
    pub async fn collect_body(self) -> String {
        let lines: Vec<String> = self
            .lines
            .filter_map(|line| async move { line.ok() })
            .collect()
            .await;
        lines.join("\n")
    }
}

/// Trait for HTTP communication with the model backends.
///
/// This abstraction allows injecting mock HTTP clients for testing without
/// making real network requests.
///
/// # Example
///
/// ```ignore
/// use jarvissh::http_client::{HttpClient, ReqwestHttpClient};
///
/// let client = ReqwestHttpClient::new();
/// let response = client.post_json(
///     "http://localhost:11434/api/chat",
///     &[],
///     &serde_json::json!({"model": "llama3.2", "messages": []}),
/// ).await?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body and buffers the whole response.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be made or the body cannot
    /// be read. Non-2xx statuses are not errors at this layer.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError>;

    /// Sends a POST request with a JSON body and returns the body as a lazy
    /// stream of lines.
    async fn post_json_stream(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<StreamingResponse, TransportError>;
}

/// HTTP client implementation using reqwest.
///
/// This is the default production implementation that makes real HTTP requests.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a new HTTP client with default configuration.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn send(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        Ok(request.json(body).send().await?)
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, TransportError> {
        let response = self.send(url, headers, body).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<StreamingResponse, TransportError> {
        let response = self.send(url, headers, body).await?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(TransportError::from));
        Ok(StreamingResponse {
            status,
            lines: split_lines(bytes),
        })
    }
}

/// Re-frames a stream of arbitrary byte chunks into text lines.
///
/// Lines may span chunk boundaries; a trailing line without a newline is
/// still emitted. A transport error ends the stream after being yielded.
pub fn split_lines<S>(bytes: S) -> LineStream
where
    S: futures_util::Stream<Item = Result<Vec<u8>, TransportError>> + Send + 'static,
{
    let state = (bytes.boxed(), Vec::<u8>::new(), false);
    stream::unfold(state, |(mut inner, mut buf, mut done)| async move {
        loop {
            if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                let text = decode_line(&line);
                return Some((Ok(text), (inner, buf, done)));
            }
            if done {
                if buf.is_empty() {
                    return None;
                }
                let text = decode_line(&buf);
                buf.clear();
                return Some((Ok(text), (inner, buf, done)));
            }
            match inner.next().await {
                Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
                Some(Err(err)) => {
                    buf.clear();
                    return Some((Err(err), (inner, buf, true)));
                }
                None => done = true,
            }
        }
    })
    .boxed()
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(|c: char| c == '\r' || c == '\n')
        .to_string()
}
