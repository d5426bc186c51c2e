use thiserror::Error;

/// Failures of a single facade request
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FacadeError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Model not allowed: {0}")]
    ModelNotAllowed(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),
}

impl FacadeError {
    /// Whether the caller, rather than the server or the generation service, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FacadeError::MalformedRequest(_) | FacadeError::ModelNotAllowed(_)
        )
    }
}

pub type FacadeResult<T> = Result<T, FacadeError>;
