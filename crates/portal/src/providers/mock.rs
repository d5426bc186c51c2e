use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::models::event::{FinishReason, StreamEvent};
use crate::providers::base::{Completion, EventStream, GenerationRequest, Provider, Usage};

/// One scripted step of a mock generation
#[derive(Debug, Clone)]
pub enum MockStep {
    Event(StreamEvent),
    Fail(String),
}

#[derive(Default)]
struct Recorder {
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
    tokens: Mutex<Vec<CancellationToken>>,
    stream_dropped: AtomicBool,
}

/// Read-only view of what a [`MockProvider`] was asked to do
#[derive(Clone)]
pub struct MockHandle {
    recorder: Arc<Recorder>,
}

impl MockHandle {
    pub fn calls(&self) -> usize {
        self.recorder.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.recorder.requests.lock().unwrap().clone()
    }

    /// Whether the cancellation token of every call so far has fired
    pub fn all_cancelled(&self) -> bool {
        let tokens = self.recorder.tokens.lock().unwrap();
        !tokens.is_empty() && tokens.iter().all(CancellationToken::is_cancelled)
    }

    /// Whether a stream handed out by the provider has been released
    pub fn stream_dropped(&self) -> bool {
        self.recorder.stream_dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<Recorder>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.stream_dropped.store(true, Ordering::SeqCst);
    }
}

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    steps: Vec<MockStep>,
    completion: Result<String, String>,
    reject: Option<String>,
    hang: bool,
    delay: Option<Duration>,
    recorder: Arc<Recorder>,
}

impl MockProvider {
    /// Stream the given events, then a `Done` unless the script already ends with one
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self::scripted(events.into_iter().map(MockStep::Event).collect())
    }

    pub fn scripted(steps: Vec<MockStep>) -> Self {
        Self {
            steps,
            completion: Ok("4".to_string()),
            reject: None,
            hang: false,
            delay: None,
            recorder: Arc::new(Recorder::default()),
        }
    }

    /// Fail every call before producing anything
    pub fn rejecting<S: Into<String>>(message: S) -> Self {
        Self {
            reject: Some(message.into()),
            ..Self::new(vec![])
        }
    }

    pub fn with_completion<S: Into<String>>(mut self, text: S) -> Self {
        self.completion = Ok(text.into());
        self
    }

    pub fn with_failed_completion<S: Into<String>>(mut self, message: S) -> Self {
        self.completion = Err(message.into());
        self
    }

    /// Keep the stream open after the scripted steps until the call is cancelled
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Wait before every scripted step
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            recorder: self.recorder.clone(),
        }
    }

    fn record(&self, request: GenerationRequest, cancel: &CancellationToken) {
        self.recorder.calls.fetch_add(1, Ordering::SeqCst);
        self.recorder.requests.lock().unwrap().push(request);
        self.recorder.tokens.lock().unwrap().push(cancel.clone());
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn stream(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream> {
        self.record(request, &cancel);
        if let Some(message) = &self.reject {
            return Err(anyhow!(message.clone()));
        }

        let steps = self.steps.clone();
        let ends_with_done = matches!(steps.last(), Some(MockStep::Event(event)) if event.is_done());
        let hang = self.hang;
        let delay = self.delay;
        let flag = DropFlag(self.recorder.clone());

        let stream = async_stream::stream! {
            let _flag = flag;
            for step in steps {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if cancel.is_cancelled() {
                    return;
                }
                match step {
                    MockStep::Event(event) => yield Ok(event),
                    MockStep::Fail(message) => {
                        yield Err(anyhow!(message));
                        return;
                    }
                }
            }
            if hang {
                cancel.cancelled().await;
                return;
            }
            if !ends_with_done {
                yield Ok(StreamEvent::done(FinishReason::Stop));
            }
        };
        Ok(Box::pin(stream))
    }

    async fn complete(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<Completion> {
        self.record(request, &cancel);
        if let Some(message) = &self.reject {
            return Err(anyhow!(message.clone()));
        }
        if self.hang {
            cancel.cancelled().await;
            return Err(anyhow!("generation cancelled"));
        }

        match &self.completion {
            Ok(text) => Ok(Completion {
                text: text.clone(),
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            }),
            Err(message) => Err(anyhow!(message.clone())),
        }
    }
}
