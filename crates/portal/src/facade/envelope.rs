use crate::errors::{FacadeError, FacadeResult};
use crate::models::message::Message;

/// A conversation to continue, as received from the caller
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatEnvelope {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatEnvelope {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> FacadeResult<()> {
        if self.messages.is_empty() {
            return Err(FacadeError::MalformedRequest(
                "messages must not be empty".to_string(),
            ));
        }
        if let Some(index) = self.messages.iter().position(|m| m.content.is_empty()) {
            return Err(FacadeError::MalformedRequest(format!(
                "message {} has no content",
                index
            )));
        }
        Ok(())
    }
}

/// A single prompt to answer in one piece
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new<S: Into<String>>(prompt: S) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> FacadeResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(FacadeError::MalformedRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
