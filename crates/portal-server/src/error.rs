use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portal::errors::FacadeError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

// Convert a config key like "provider.api_key" to PORTAL_PROVIDER__API_KEY
pub fn to_env_var(field_path: &str) -> String {
    let mut env_var = String::from("PORTAL_");
    env_var.push_str(&field_path.to_uppercase().replace('.', "__"));
    env_var
}

/// Failures surfaced to HTTP callers as `{ error, success: false }`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Facade(#[from] FacadeError),
    #[error("{0}")]
    NotFound(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    success: bool,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Facade(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Facade(FacadeError::Cancelled) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Facade(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Facade(FacadeError::MalformedRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                success: false,
            }),
        )
            .into_response()
    }
}
