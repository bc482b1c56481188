use std::time::Duration;

use eventsource_stream::Eventsource;
use futures_util::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::gateway::{
    ChatCompletion, ChatCompletionRequest, ChatMessage, CompletionStream, LlmGateway,
    LlmGatewayError, LlmGatewayFuture, LlmTokenUsage,
};

pub const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum OpenAiConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build OpenAI http client: {0}")]
    HttpClient(String),
}

/// Chat-completions client for OpenAI-compatible endpoints. Every call is a
/// single attempt.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, OpenAiConfigError> {
        if config.api_key.trim().is_empty() {
            return Err(OpenAiConfigError::InvalidConfiguration(
                "api key must not be empty".to_string(),
            ));
        }
        if !config.chat_completions_url.starts_with("http://")
            && !config.chat_completions_url.starts_with("https://")
        {
            return Err(OpenAiConfigError::InvalidConfiguration(
                "chat completions url must start with http:// or https://".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| OpenAiConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn post(
        &self,
        request: &ChatCompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LlmGatewayError> {
        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        let timeout = self.timeout();
        let mut builder = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&body);
        // Streamed bodies are bounded per event instead, see `sse_fragments`.
        if !stream {
            builder = builder.timeout(timeout);
        }

        let response = tokio::time::timeout(timeout, builder.send())
            .await
            .map_err(|_| LlmGatewayError::Timeout)?
            .map_err(|err| {
                if err.is_timeout() {
                    LlmGatewayError::Timeout
                } else {
                    LlmGatewayError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmGatewayError::ProviderFailure(format!(
                "status={} code={}",
                status.as_u16(),
                parse_provider_error_code(&body)
            )));
        }

        Ok(response)
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    async fn complete_once(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletion, LlmGatewayError> {
        let response = self.post(request, false).await?;
        let header_request_id = header_request_id(response.headers());
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                LlmGatewayError::Timeout
            } else {
                LlmGatewayError::InvalidProviderPayload("response_body_read_failed".to_string())
            }
        })?;

        let parsed: CompletionResponse = serde_json::from_str(&body).map_err(|_| {
            LlmGatewayError::InvalidProviderPayload("response_json_parse_failed".to_string())
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmGatewayError::InvalidProviderPayload("missing_choice".to_string()))?
            .message
            .content
            .ok_or_else(|| LlmGatewayError::InvalidProviderPayload("missing_content".to_string()))?;

        Ok(ChatCompletion {
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            provider_request_id: header_request_id.or(parsed.id),
            content,
            usage: parsed.usage.map(|usage| LlmTokenUsage {
                prompt_tokens: clamp_u64_to_u32(usage.prompt_tokens.unwrap_or(0)),
                completion_tokens: clamp_u64_to_u32(usage.completion_tokens.unwrap_or(0)),
                total_tokens: clamp_u64_to_u32(usage.total_tokens.unwrap_or(0)),
            }),
        })
    }
}

impl LlmGateway for OpenAiGateway {
    fn complete<'a>(
        &'a self,
        request: ChatCompletionRequest,
    ) -> LlmGatewayFuture<'a, ChatCompletion> {
        Box::pin(async move { self.complete_once(&request).await })
    }

    fn stream<'a>(
        &'a self,
        request: ChatCompletionRequest,
    ) -> LlmGatewayFuture<'a, CompletionStream> {
        Box::pin(async move {
            let response = self.post(&request, true).await?;
            Ok(sse_fragments(response, self.timeout()))
        })
    }
}

/// Decodes an SSE reply body. `idle_timeout` bounds the wait for each event,
/// not the whole reply.
fn sse_fragments(response: reqwest::Response, idle_timeout: Duration) -> CompletionStream {
    let events = Box::pin(response.bytes_stream().eventsource());

    Box::pin(stream::unfold(Some(events), move |state| async move {
        let mut events = state?;
        loop {
            let event = match tokio::time::timeout(idle_timeout, events.next()).await {
                Err(_) => return Some((Err(LlmGatewayError::Timeout), None)),
                Ok(Some(Ok(event))) => event,
                Ok(Some(Err(err))) => {
                    let error =
                        LlmGatewayError::ProviderFailure(format!("stream_read_failed: {err}"));
                    return Some((Err(error), None));
                }
                Ok(None) => return None,
            };

            match parse_stream_event(&event.data) {
                StreamEvent::Fragment(text) => return Some((Ok(text), Some(events))),
                StreamEvent::Skip => continue,
                StreamEvent::Done => return None,
                StreamEvent::Failed(error) => return Some((Err(error), None)),
            }
        }
    }))
}

#[derive(Debug)]
pub(crate) enum StreamEvent {
    Fragment(String),
    Skip,
    Done,
    Failed(LlmGatewayError),
}

pub(crate) fn parse_stream_event(data: &str) -> StreamEvent {
    let data = data.trim();
    if data == "[DONE]" {
        return StreamEvent::Done;
    }
    if data.is_empty() {
        return StreamEvent::Skip;
    }

    let Ok(chunk) = serde_json::from_str::<Value>(data) else {
        return StreamEvent::Failed(LlmGatewayError::InvalidProviderPayload(
            "stream_chunk_not_json".to_string(),
        ));
    };

    if let Some(message) = stream_error_message(&chunk) {
        return StreamEvent::Failed(LlmGatewayError::ProviderFailure(message));
    }

    let Ok(chunk) = serde_json::from_value::<StreamChunk>(chunk) else {
        return StreamEvent::Failed(LlmGatewayError::InvalidProviderPayload(
            "stream_chunk_schema_mismatch".to_string(),
        ));
    };

    match chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
    {
        Some(text) if !text.is_empty() => StreamEvent::Fragment(text),
        _ => StreamEvent::Skip,
    }
}

fn stream_error_message(chunk: &Value) -> Option<String> {
    let error = chunk.get("error")?;
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("stream_error".to_string())
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

fn header_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn parse_provider_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        code: Option<Value>,
        #[serde(rename = "type")]
        kind: Option<String>,
    }

    let Some(details) = serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
    else {
        return "unknown".to_string();
    };

    match details.code {
        Some(Value::String(code)) => code,
        Some(Value::Number(code)) => code.to_string(),
        _ => details.kind.unwrap_or_else(|| "unknown".to_string()),
    }
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
