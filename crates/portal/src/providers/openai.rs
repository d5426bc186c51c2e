use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::base::{Completion, EventStream, GenerationRequest, Provider};
use super::configs::{OllamaProviderConfig, OpenAiProviderConfig};
use super::sse::SseDecoder;
use super::utils::{
    get_usage, messages_to_openai_spec, openai_error_message, openai_response_to_text,
    tools_to_openai_spec, ToolCallAssembler,
};
use crate::models::event::{FinishReason, StreamEvent};

const CANCELLED: &str = "generation cancelled";

/// Provider for any service speaking the openai chat completions protocol
pub struct OpenAiProvider {
    client: Client,
    host: String,
    api_key: Option<String>,
    max_tokens_field: &'static str,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        Ok(Self {
            client: Self::client(config.timeout)?,
            host: config.host,
            api_key: Some(config.api_key),
            max_tokens_field: "max_completion_tokens",
        })
    }

    /// Ollama serves the same protocol without authentication
    pub fn ollama(config: OllamaProviderConfig) -> Result<Self> {
        Ok(Self {
            client: Self::client(config.timeout)?,
            host: config.host,
            api_key: None,
            max_tokens_field: "max_tokens",
        })
    }

    fn client(timeout: Duration) -> Result<Client> {
        Ok(Client::builder().timeout(timeout).build()?)
    }

    fn build_payload(&self, request: &GenerationRequest, stream: bool) -> Result<Value> {
        let mut payload = json!({
            "model": request.model,
            "messages": messages_to_openai_spec(&request.messages),
            "stream": stream,
        });
        let object = payload
            .as_object_mut()
            .ok_or_else(|| anyhow!("payload is not an object"))?;

        if !request.tools.is_empty() {
            object.insert(
                "tools".to_string(),
                json!(tools_to_openai_spec(&request.tools)?),
            );
        }
        if let Some(temp) = request.temperature {
            object.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = request.max_tokens {
            object.insert(self.max_tokens_field.to_string(), json!(tokens));
        }
        if stream {
            object.insert(
                "stream_options".to_string(),
                json!({ "include_usage": true }),
            );
        }
        Ok(payload)
    }

    async fn post(&self, payload: &Value) -> Result<Response> {
        let url = format!(
            "{}/v1/chat/completions",
            self.host.trim_end_matches('/')
        );

        let mut builder = self.client.post(&url).json(payload);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }
        let response = builder.send().await?;

        match response.status() {
            StatusCode::OK => Ok(response),
            status => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<Value>(&body)
                    .ok()
                    .and_then(|data| openai_error_message(&data))
                    .unwrap_or(body);
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    Err(anyhow!("Server error ({}): {}", status, message))
                } else {
                    Err(anyhow!("Request failed ({}): {}", status, message))
                }
            }
        }
    }

    async fn complete_inner(&self, payload: Value) -> Result<Completion> {
        let response: Value = self.post(&payload).await?.json().await?;
        if let Some(message) = openai_error_message(&response) {
            return Err(anyhow!("Generation service error: {}", message));
        }

        let finish_reason = response["choices"][0]["finish_reason"]
            .as_str()
            .map(FinishReason::from_openai)
            .unwrap_or(FinishReason::Stop);

        Ok(Completion {
            text: openai_response_to_text(&response)?,
            finish_reason,
            usage: get_usage(&response).unwrap_or_default(),
        })
    }
}

fn check_chunk(chunk: &Value) -> Result<()> {
    match openai_error_message(chunk) {
        Some(message) => Err(anyhow!("Generation service error: {}", message)),
        None => Ok(()),
    }
}

/// Turn a chat completions event stream body into our events
fn read_events<S>(mut body: S, cancel: CancellationToken) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + Unpin + 'static,
{
    async_stream::try_stream! {
        let mut decoder = SseDecoder::new();
        let mut assembler = ToolCallAssembler::new();
        let mut finish_reason = None;
        let mut usage = None;

        'read: loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => None,
                next = body.next() => next,
            };
            if cancel.is_cancelled() {
                tracing::debug!("upstream stream cancelled, closing connection");
                return;
            }
            let Some(bytes) = next else { break };
            let bytes = bytes.map_err(|e| anyhow!("Error reading generation stream: {}", e))?;
            let events = decoder
                .push(&bytes)
                .map_err(|e| anyhow!("Invalid generation stream: {}", e))?;

            for data in events {
                if data == "[DONE]" {
                    break 'read;
                }
                let chunk: Value = serde_json::from_str(&data)
                    .map_err(|e| anyhow!("Invalid generation chunk: {}", e))?;
                check_chunk(&chunk)?;

                if let Some(chunk_usage) = get_usage(&chunk) {
                    usage = Some(chunk_usage);
                }
                let Some(choice) = chunk.get("choices").and_then(|c| c.get(0)) else {
                    continue;
                };

                let delta = &choice["delta"];
                if let Some(text) = delta.get("content").and_then(Value::as_str) {
                    if !text.is_empty() {
                        yield StreamEvent::text(text);
                    }
                }
                if let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) {
                    for tool_call in tool_calls {
                        assembler.on_delta(tool_call);
                    }
                }
                if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
                    finish_reason = Some(FinishReason::from_openai(reason));
                    for event in assembler.drain() {
                        yield event;
                    }
                }
            }
        }

        for event in assembler.drain() {
            yield event;
        }
        yield StreamEvent::Done {
            finish_reason: finish_reason.unwrap_or(FinishReason::Stop),
            usage,
        };
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn stream(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream> {
        let payload = self.build_payload(&request, true)?;
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(anyhow!(CANCELLED)),
            response = self.post(&payload) => response?,
        };

        let body = Box::pin(response.bytes_stream());
        Ok(Box::pin(read_events(body, cancel)))
    }

    async fn complete(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<Completion> {
        let payload = self.build_payload(&request, false)?;
        tokio::select! {
            _ = cancel.cancelled() => Err(anyhow!(CANCELLED)),
            completion = self.complete_inner(payload) => completion,
        }
    }
}
