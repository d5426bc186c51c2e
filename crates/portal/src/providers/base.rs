use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::models::event::{FinishReason, StreamEvent};
use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Everything the generation service needs for one call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A fully materialized, non-streamed generation
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// Events of one generation call. The stream ends after `StreamEvent::Done`, after the
/// first `Err`, or as soon as the call's cancellation token fires.
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// Base trait for generation services (OpenAI, Ollama, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Start a streaming generation. Errors returned here happen before any event exists.
    async fn stream(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream>;

    /// Generate the whole response in one round trip
    async fn complete(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<Completion>;
}
