//! The request facade: validate an envelope, make exactly one upstream call,
//! and hand the caller a stream of events that ends with a single `Done`.
//!
//! A [`ChatStream`] owns a guard on the request's cancellation token, so
//! dropping it (for instance when the HTTP client goes away) cancels the
//! upstream call and stops the relay task.

pub mod envelope;
pub mod relay;

use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::errors::{FacadeError, FacadeResult};
use crate::models::event::StreamEvent;
use crate::models::message::Message;
use crate::providers::base::{Completion, GenerationRequest, Provider};
use crate::tools::ToolRegistry;

pub use envelope::{ChatEnvelope, CompletionRequest};
pub use relay::{Relay, RelayOutcome};

const CHANNEL_CAPACITY: usize = 100;

/// Values used when a request leaves a generation parameter out
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationDefaults {
    pub default_model: String,
    pub chat_max_tokens: u32,
    pub chat_temperature: f32,
    pub completion_max_tokens: u32,
    pub completion_temperature: f32,
    pub max_duration: Duration,
    /// Models a request may name. Empty means any model is accepted.
    pub allowed_models: Vec<String>,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            default_model: "gpt-5-mini".to_string(),
            chat_max_tokens: 2000,
            chat_temperature: 0.7,
            completion_max_tokens: 1000,
            completion_temperature: 0.7,
            max_duration: Duration::from_secs(30),
            allowed_models: Vec::new(),
        }
    }
}

/// Events of one chat request, in arrival order.
///
/// Dropping the stream cancels the request.
pub struct ChatStream {
    rx: ReceiverStream<StreamEvent>,
    _guard: DropGuard,
}

impl Stream for ChatStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

#[derive(Clone)]
pub struct ChatFacade {
    provider: Arc<dyn Provider>,
    defaults: GenerationDefaults,
}

impl ChatFacade {
    pub fn new(provider: Arc<dyn Provider>, defaults: GenerationDefaults) -> Self {
        Self { provider, defaults }
    }

    pub fn defaults(&self) -> &GenerationDefaults {
        &self.defaults
    }

    /// The model to call for a request, or `ModelNotAllowed`
    pub fn resolve_model(&self, requested: Option<&str>) -> FacadeResult<String> {
        let model = match requested.map(str::trim) {
            Some(model) if !model.is_empty() => model,
            _ => return Ok(self.defaults.default_model.clone()),
        };

        let allowed = &self.defaults.allowed_models;
        if allowed.is_empty()
            || model == self.defaults.default_model
            || allowed.iter().any(|m| m == model)
        {
            Ok(model.to_string())
        } else {
            Err(FacadeError::ModelNotAllowed(model.to_string()))
        }
    }

    /// Start streaming a chat reply.
    ///
    /// Validation and the upstream call happen before this returns, so an
    /// error here means nothing was streamed. Once a [`ChatStream`] is
    /// returned, later failures arrive in-band as an `Error` event followed
    /// by `Done`.
    pub async fn stream_chat(
        &self,
        envelope: ChatEnvelope,
        tools: Option<Arc<ToolRegistry>>,
        cancel: CancellationToken,
    ) -> FacadeResult<ChatStream> {
        envelope.validate()?;
        let model = self.resolve_model(envelope.model.as_deref())?;
        let tool_descriptors = tools.as_ref().map(|t| t.tools()).unwrap_or_default();

        tracing::info!(
            model = %model,
            messages = envelope.messages.len(),
            tools = tool_descriptors.len(),
            "starting chat stream"
        );

        let request = GenerationRequest {
            model,
            messages: envelope.messages,
            tools: tool_descriptors,
            temperature: Some(envelope.temperature.unwrap_or(self.defaults.chat_temperature)),
            max_tokens: Some(envelope.max_tokens.unwrap_or(self.defaults.chat_max_tokens)),
        };

        let deadline = Instant::now() + self.defaults.max_duration;
        let upstream = match tokio::time::timeout_at(
            deadline,
            self.provider.stream(request, cancel.clone()),
        )
        .await
        {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(err)) if cancel.is_cancelled() => {
                tracing::info!("chat request cancelled before streaming: {}", err);
                return Err(FacadeError::Cancelled);
            }
            Ok(Err(err)) => {
                let failure = FacadeError::GenerationFailed(err.to_string());
                tracing::error!("{}", failure);
                return Err(failure);
            }
            Err(_) => {
                cancel.cancel();
                tracing::warn!("chat request timed out before streaming");
                return Err(FacadeError::Cancelled);
            }
        };

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let relay = Relay::new(tx, tools, cancel.clone(), deadline);
        tokio::spawn(async move {
            match relay.run(upstream).await {
                RelayOutcome::Completed => tracing::info!("chat stream completed"),
                RelayOutcome::Cancelled => tracing::info!("chat stream cancelled"),
                RelayOutcome::Failed(message) => {
                    tracing::warn!("chat stream failed: {}", message)
                }
            }
        });

        Ok(ChatStream {
            rx: ReceiverStream::new(rx),
            _guard: cancel.drop_guard(),
        })
    }

    /// Generate a whole reply to a single prompt
    pub async fn complete(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> FacadeResult<Completion> {
        request.validate()?;
        let model = self.resolve_model(request.model.as_deref())?;
        tracing::info!(model = %model, "starting completion");

        let generation = GenerationRequest {
            model,
            messages: vec![Message::user().with_text(request.prompt)],
            tools: vec![],
            temperature: Some(
                request
                    .temperature
                    .unwrap_or(self.defaults.completion_temperature),
            ),
            max_tokens: Some(
                request
                    .max_tokens
                    .unwrap_or(self.defaults.completion_max_tokens),
            ),
        };

        let call = self.provider.complete(generation, cancel.clone());
        match tokio::time::timeout(self.defaults.max_duration, call).await {
            Ok(Ok(completion)) => {
                tracing::info!(
                    finish_reason = completion.finish_reason.as_str(),
                    "completion finished"
                );
                Ok(completion)
            }
            Ok(Err(_)) if cancel.is_cancelled() => Err(FacadeError::Cancelled),
            Ok(Err(err)) => {
                let failure = FacadeError::GenerationFailed(err.to_string());
                tracing::error!("{}", failure);
                Err(failure)
            }
            Err(_) => {
                cancel.cancel();
                tracing::warn!("completion exceeded its maximum duration");
                Err(FacadeError::Cancelled)
            }
        }
    }
}
