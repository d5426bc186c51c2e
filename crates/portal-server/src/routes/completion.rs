use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use portal::facade::CompletionRequest;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionBody {
    prompt: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CompletionResponse {
    text: String,
    success: bool,
}

// simple ask for a response, non streaming
async fn completion_handler(
    State(state): State<AppState>,
    payload: Result<Json<CompletionBody>, JsonRejection>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let Json(body) = payload?;
    let request = CompletionRequest {
        prompt: body.prompt,
        model: body.model,
        temperature: body.temperature,
        max_tokens: body.max_tokens,
    };

    // Held for the whole call: a dropped connection cancels the generation
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let completion = state.facade.complete(request, cancel).await?;

    Ok(Json(CompletionResponse {
        text: completion.text,
        success: true,
    }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/completion", post(completion_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_string, json_post, state, state_with};
    use axum::http::StatusCode;
    use portal::facade::GenerationDefaults;
    use portal::providers::mock::MockProvider;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn post_completion(app: Router, body: &str) -> (StatusCode, Value) {
        let response = app.oneshot(json_post("/completion", body)).await.unwrap();
        let status = response.status();
        let payload = serde_json::from_str(&body_string(response).await).unwrap();
        (status, payload)
    }

    #[tokio::test]
    async fn test_completion_success() {
        let provider = MockProvider::new(vec![]).with_completion("2 + 2 = 4");
        let handle = provider.handle();

        let (status, payload) = post_completion(
            routes(state(provider)),
            r#"{"prompt":"2+2","maxTokens":50,"temperature":0.2}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["success"], true);
        assert_eq!(payload["text"], "2 + 2 = 4");

        let request = &handle.requests()[0];
        assert_eq!(request.max_tokens, Some(50));
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.model, "gpt-5-mini");
    }

    #[tokio::test]
    async fn test_completion_failure() {
        let provider = MockProvider::new(vec![]).with_failed_completion("model overloaded");

        let (status, payload) =
            post_completion(routes(state(provider)), r#"{"prompt":"2+2"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"], "Generation failed: model overloaded");
    }

    #[tokio::test]
    async fn test_completion_missing_prompt() {
        let provider = MockProvider::new(vec![]);
        let handle = provider.handle();

        let (status, payload) =
            post_completion(routes(state(provider)), r#"{"model":"gpt-5-mini"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["success"], false);
        assert_eq!(handle.calls(), 0);
    }

    #[tokio::test]
    async fn test_completion_model_not_allowed() {
        let provider = MockProvider::new(vec![]);
        let handle = provider.handle();
        let defaults = GenerationDefaults {
            allowed_models: vec!["gpt-4o".into()],
            ..Default::default()
        };

        let (status, payload) = post_completion(
            routes(state_with(provider, defaults)),
            r#"{"prompt":"2+2","model":"o3"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"], "Model not allowed: o3");
        assert_eq!(handle.calls(), 0);
    }

    #[tokio::test]
    async fn test_completion_timeout() {
        let provider = MockProvider::new(vec![]).hanging();
        let defaults = GenerationDefaults {
            max_duration: Duration::from_millis(20),
            ..Default::default()
        };

        let (status, payload) = post_completion(
            routes(state_with(provider, defaults)),
            r#"{"prompt":"2+2"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(payload["success"], false);
    }
}
