use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::FacadeError;
use crate::models::event::{FinishReason, StreamEvent};
use crate::providers::base::EventStream;
use crate::tools::ToolRegistry;

/// How a relayed request ended
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// The upstream stream finished and `Done` was delivered
    Completed,
    /// The caller went away, or the duration ceiling was hit
    Cancelled,
    /// The upstream failed mid-stream; an error frame and `Done` were delivered
    Failed(String),
}

struct Interrupted;

/// Pipes one upstream generation stream into the caller's channel.
///
/// Events are forwarded one at a time in arrival order. Tool calls naming a
/// registered tool are answered right after the call is forwarded.
pub struct Relay {
    tx: mpsc::Sender<StreamEvent>,
    tools: Option<Arc<ToolRegistry>>,
    cancel: CancellationToken,
    deadline: Instant,
}

impl Relay {
    pub fn new(
        tx: mpsc::Sender<StreamEvent>,
        tools: Option<Arc<ToolRegistry>>,
        cancel: CancellationToken,
        deadline: Instant,
    ) -> Self {
        Self {
            tx,
            tools,
            cancel,
            deadline,
        }
    }

    // Resolves once relaying should stop: explicit cancel, caller gone, or out of time.
    async fn interrupted(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.tx.closed() => {}
            _ = tokio::time::sleep_until(self.deadline) => {
                tracing::warn!("request exceeded its maximum duration");
            }
        }
    }

    async fn send(&self, event: StreamEvent) -> Result<(), Interrupted> {
        tokio::select! {
            biased;
            _ = self.interrupted() => Err(Interrupted),
            sent = self.tx.send(event) => sent.map_err(|_| Interrupted),
        }
    }

    async fn run_tool(
        &self,
        registry: &ToolRegistry,
        id: String,
        name: String,
        arguments: serde_json::Value,
    ) -> Result<StreamEvent, Interrupted> {
        tracing::info!(tool = %name, call_id = %id, "invoking tool");
        let call = registry.call(&name, arguments);
        let result = tokio::select! {
            biased;
            _ = self.interrupted() => return Err(Interrupted),
            result = call => result,
        };

        let result = match result {
            Ok(value) => value,
            Err(err) => {
                let failure = FacadeError::ToolExecutionFailed(err.to_string());
                tracing::warn!(tool = %name, "{}", failure);
                json!({ "error": err.to_string() })
            }
        };
        Ok(StreamEvent::ToolResult { id, name, result })
    }

    // The registered tool a call names, if any
    fn tool_call_target(&self, event: &StreamEvent) -> Option<(Arc<ToolRegistry>, StreamEvent)> {
        match (event, &self.tools) {
            (StreamEvent::ToolCall { name, .. }, Some(tools)) if tools.contains(name) => {
                Some((tools.clone(), event.clone()))
            }
            _ => None,
        }
    }

    async fn forward(&self, upstream: &mut EventStream) -> Result<RelayOutcome, Interrupted> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.interrupted() => return Err(Interrupted),
                next = upstream.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    let done = event.is_done();
                    let target = self.tool_call_target(&event);
                    self.send(event).await?;

                    if let Some((registry, StreamEvent::ToolCall { id, name, arguments })) = target
                    {
                        let result = self.run_tool(&registry, id, name, arguments).await?;
                        self.send(result).await?;
                    }
                    if done {
                        return Ok(RelayOutcome::Completed);
                    }
                }
                Some(Err(err)) => {
                    if self.cancel.is_cancelled() {
                        return Err(Interrupted);
                    }
                    let failure = FacadeError::GenerationFailed(err.to_string());
                    tracing::error!("{}", failure);
                    self.send(StreamEvent::Error {
                        message: err.to_string(),
                    })
                    .await?;
                    self.send(StreamEvent::done(FinishReason::Error)).await?;
                    return Ok(RelayOutcome::Failed(err.to_string()));
                }
                None => {
                    // The upstream ended without a terminal marker
                    self.send(StreamEvent::done(FinishReason::Stop)).await?;
                    return Ok(RelayOutcome::Completed);
                }
            }
        }
    }

    /// Relay until the stream completes, fails, or the request is cancelled.
    /// The upstream stream is dropped before this returns.
    pub async fn run(self, mut upstream: EventStream) -> RelayOutcome {
        let outcome = match self.forward(&mut upstream).await {
            Ok(outcome) => outcome,
            Err(Interrupted) => {
                self.cancel.cancel();
                RelayOutcome::Cancelled
            }
        };
        drop(upstream);
        outcome
    }
}
