//! LLM provider streaming implementations.
//!
//! Every variant turns an upstream SSE response into a stream of non-empty
//! text fragments in generation order. An upstream failure ends the stream
//! with a single `Err` item; nothing is retried or buffered. OpenAI and
//! Ollama share the chat-completions wire format, Anthropic has its own.

use std::pin::Pin;

use aion_core::{Error, ProviderSettings, Result};
use futures::Stream;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

use crate::config::{
    ANTHROPIC_MAX_TOKENS, ANTHROPIC_VERSION, DEFAULT_ANTHROPIC_MODEL, DEFAULT_OPENAI_MODEL,
    OLLAMA_PLACEHOLDER_KEY,
};
use crate::sse::SseDecoder;
use crate::types::{Message, Role};

/// Lazy sequence of generated text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAI,
    Ollama,
    Anthropic,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAI => write!(f, "openai"),
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// A configured provider, ready to stream completions.
#[derive(Clone)]
pub struct Provider {
    kind: ProviderKind,
    client: Client,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
}

impl Provider {
    pub fn new(kind: ProviderKind, settings: &ProviderSettings, client: Client) -> Self {
        match kind {
            ProviderKind::OpenAI => Self::openai(settings, client),
            ProviderKind::Ollama => Self::ollama(settings, client),
            ProviderKind::Anthropic => Self::anthropic(settings, client),
        }
    }

    /// OpenAI. A missing key is reported here but only fails at call time.
    pub fn openai(settings: &ProviderSettings, client: Client) -> Self {
        match &settings.openai_api_key {
            Some(key) => info!("OpenAI provider initialized (key length: {})", key.len()),
            None => error!("OPENAI_API_KEY is missing; OpenAI requests will fail"),
        }

        Self {
            kind: ProviderKind::OpenAI,
            client,
            base_url: trim_base(&settings.openai_base_url),
            api_key: settings.openai_api_key.clone(),
            default_model: DEFAULT_OPENAI_MODEL.into(),
        }
    }

    /// Local Ollama through its OpenAI-compatible endpoint.
    pub fn ollama(settings: &ProviderSettings, client: Client) -> Self {
        Self {
            kind: ProviderKind::Ollama,
            client,
            base_url: trim_base(&settings.ollama_base_url),
            api_key: Some(OLLAMA_PLACEHOLDER_KEY.into()),
            default_model: settings.ollama_model.clone(),
        }
    }

    pub fn anthropic(settings: &ProviderSettings, client: Client) -> Self {
        Self {
            kind: ProviderKind::Anthropic,
            client,
            base_url: trim_base(&settings.anthropic_base_url),
            api_key: settings.anthropic_api_key.clone(),
            default_model: DEFAULT_ANTHROPIC_MODEL.into(),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Stream a completion for `messages`, using `model` or the provider default.
    ///
    /// Nothing is sent until the returned stream is first polled.
    pub fn stream(&self, messages: Vec<Message>, model: Option<&str>) -> TextStream {
        let model = model.unwrap_or(&self.default_model).to_string();
        match self.kind {
            ProviderKind::OpenAI | ProviderKind::Ollama => Box::pin(stream_openai_compat(
                self.client.clone(),
                format!("{}/chat/completions", self.base_url),
                self.api_key.clone(),
                messages,
                model,
            )),
            ProviderKind::Anthropic => Box::pin(stream_anthropic(
                self.client.clone(),
                format!("{}/messages", self.base_url),
                self.api_key.clone(),
                messages,
                model,
            )),
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_model", &self.default_model)
            .finish()
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Send the request and hand back the response only if it is a 2xx.
async fn open_stream(request: RequestBuilder) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Provider(format!("API error {}: {}", status, body)));
    }

    Ok(response)
}

fn parse_event(data: &str) -> Result<Value> {
    serde_json::from_str(data)
        .map_err(|e| Error::Provider(format!("Malformed stream event: {}", e)))
}

/// Stream from OpenAI-compatible APIs (OpenAI, Ollama).
fn stream_openai_compat(
    client: Client,
    url: String,
    api_key: Option<String>,
    messages: Vec<Message>,
    model: String,
) -> impl Stream<Item = Result<String>> + Send + 'static {
    async_stream::stream! {
        let body = json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });

        debug!("Streaming from {} with model {}", url, model);

        let mut request = client.post(&url).json(&body);
        if let Some(key) = &api_key {
            request = request.bearer_auth(key);
        }

        let response = match open_stream(request).await {
            Ok(r) => r,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut finished = false;

        while !finished {
            let payloads = match body.next().await {
                Some(Ok(bytes)) => decoder.push(&bytes),
                Some(Err(e)) => {
                    yield Err(Error::Http(format!("Stream read error: {}", e)));
                    return;
                }
                None => {
                    finished = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for data in payloads {
                if data.trim() == "[DONE]" {
                    return;
                }

                let event = match parse_event(&data) {
                    Ok(v) => v,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let upstream_error = event
                    .get("error")
                    .filter(|e| !e.is_null())
                    .map(|e| e["message"].as_str().unwrap_or("Unknown error"));
                if let Some(message) = upstream_error {
                    error!("Upstream error from {}: {}", url, message);
                    yield Err(Error::Provider(message.to_string()));
                    return;
                }

                // Usage-only and role-only chunks carry no text.
                if let Some(text) = event["choices"][0]["delta"]["content"].as_str() {
                    if !text.is_empty() {
                        yield Ok(text.to_string());
                    }
                }
            }
        }
    }
}

/// Anthropic takes system prompts as a top-level field, not as messages.
fn split_system(messages: Vec<Message>) -> (Option<String>, Vec<Message>) {
    let (system, conversation): (Vec<Message>, Vec<Message>) =
        messages.into_iter().partition(|m| m.role == Role::System);

    let system = if system.is_empty() {
        None
    } else {
        Some(
            system
                .into_iter()
                .map(|m| m.content)
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    };

    (system, conversation)
}

/// Stream from Anthropic's Messages API.
fn stream_anthropic(
    client: Client,
    url: String,
    api_key: Option<String>,
    messages: Vec<Message>,
    model: String,
) -> impl Stream<Item = Result<String>> + Send + 'static {
    async_stream::stream! {
        let Some(api_key) = api_key else {
            yield Err(Error::Config("ANTHROPIC_API_KEY is not set".into()));
            return;
        };

        let (system, conversation) = split_system(messages);
        let mut body = json!({
            "model": model,
            "messages": conversation,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "stream": true,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }

        debug!("Streaming from Anthropic with model {}", model);

        let request = client
            .post(&url)
            .header("x-api-key", &api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        // The response (and its connection) is dropped on every return below.
        let response = match open_stream(request).await {
            Ok(r) => r,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut finished = false;

        while !finished {
            let payloads = match body.next().await {
                Some(Ok(bytes)) => decoder.push(&bytes),
                Some(Err(e)) => {
                    yield Err(Error::Http(format!("Stream read error: {}", e)));
                    return;
                }
                None => {
                    finished = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for data in payloads {
                let event = match parse_event(&data) {
                    Ok(v) => v,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                match event["type"].as_str() {
                    Some("content_block_delta") => {
                        if let Some(text) = event["delta"]["text"].as_str() {
                            if !text.is_empty() {
                                yield Ok(text.to_string());
                            }
                        }
                    }
                    Some("message_stop") => return,
                    Some("error") => {
                        let msg = event["error"]["message"]
                            .as_str()
                            .unwrap_or("Unknown error");
                        error!("Anthropic error: {}", msg);
                        yield Err(Error::Provider(msg.to_string()));
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
