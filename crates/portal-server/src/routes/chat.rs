use crate::error::ApiError;
use crate::routes::protocol::SseResponse;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use portal::facade::ChatEnvelope;
use portal::models::message::Message;
use portal::models::role::Role;
use portal::models::tool::ToolCall;
use portal::tools::ToolRegistry;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    messages: Vec<IncomingMessage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    parts: Vec<IncomingPart>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum IncomingPart {
    Text {
        text: String,
    },
    ToolCall {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(default)]
        args: Value,
    },
    ToolResult {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(default)]
        result: Value,
    },
    File {
        url: String,
        #[serde(rename = "mediaType")]
        media_type: String,
    },
    // Markers such as step boundaries carry nothing for the model
    #[serde(other)]
    Other,
}

// Convert incoming messages to our internal Message type
fn convert_messages(incoming: Vec<IncomingMessage>) -> Vec<Message> {
    incoming
        .into_iter()
        .map(|msg| {
            let mut message = Message::new(msg.role);
            if let Some(content) = msg.content.filter(|c| !c.is_empty()) {
                message = message.with_text(content);
            }

            for part in msg.parts {
                message = match part {
                    IncomingPart::Text { text } if text.is_empty() => message,
                    IncomingPart::Text { text } => message.with_text(text),
                    IncomingPart::ToolCall {
                        tool_call_id,
                        tool_name,
                        args,
                    } => message.with_tool_request(tool_call_id, ToolCall::new(tool_name, args)),
                    IncomingPart::ToolResult {
                        tool_call_id,
                        tool_name,
                        result,
                    } => message.with_tool_response(tool_call_id, tool_name, result),
                    IncomingPart::File { url, media_type } => message.with_media(url, media_type),
                    IncomingPart::Other => message,
                };
            }
            message
        })
        .collect()
}

async fn stream_reply(
    state: AppState,
    payload: Result<Json<ChatRequest>, JsonRejection>,
    tools: Option<Arc<ToolRegistry>>,
) -> Result<SseResponse, ApiError> {
    let Json(request) = payload?;
    let envelope = ChatEnvelope {
        messages: convert_messages(request.messages),
        model: request.model,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };

    let events = state
        .facade
        .stream_chat(envelope, tools, CancellationToken::new())
        .await?;
    Ok(SseResponse::new(events))
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<SseResponse, ApiError> {
    stream_reply(state, payload, None).await
}

async fn chat_with_tools_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<SseResponse, ApiError> {
    let tools = state.tools.clone();
    stream_reply(state, payload, Some(tools)).await
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat-with-tools", post(chat_with_tools_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_string, json_post, state};
    use axum::http::StatusCode;
    use portal::models::event::{FinishReason, StreamEvent};
    use portal::models::message::MessageContent;
    use portal::providers::base::Usage;
    use http_body_util::BodyExt;
    use portal::providers::mock::{MockProvider, MockStep};
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    fn convert(body: Value) -> Vec<Message> {
        let request: ChatRequest = serde_json::from_value(body).unwrap();
        convert_messages(request.messages)
    }

    #[test]
    fn test_convert_content_and_parts() {
        let messages = convert(json!({
            "messages": [
                {"role": "system", "content": "Be brief"},
                {"role": "user", "parts": [
                    {"type": "step-start"},
                    {"type": "text", "text": "What is in this picture?"},
                    {"type": "file", "url": "https://example.com/cat.png", "mediaType": "image/png"}
                ]},
                {"role": "assistant", "parts": [
                    {"type": "tool-call", "toolCallId": "call_1", "toolName": "getWeather", "args": {"location": "Paris"}},
                    {"type": "tool-result", "toolCallId": "call_1", "toolName": "getWeather", "result": {"temperature": 72}}
                ]}
            ]
        }));

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::system().with_text("Be brief"));
        assert_eq!(
            messages[1],
            Message::user()
                .with_text("What is in this picture?")
                .with_media("https://example.com/cat.png", "image/png")
        );
        assert_eq!(
            messages[2],
            Message::assistant()
                .with_tool_request("call_1", ToolCall::new("getWeather", json!({"location": "Paris"})))
                .with_tool_response("call_1", "getWeather", json!({"temperature": 72}))
        );
        assert!(matches!(messages[2].content[0], MessageContent::ToolRequest(_)));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result: Result<ChatRequest, _> = serde_json::from_value(json!({
            "messages": [{"role": "robot", "content": "beep"}]
        }));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_chat_streams_protocol_frames() {
        let provider = MockProvider::new(vec![
            StreamEvent::text("Hello"),
            StreamEvent::text(", world"),
            StreamEvent::Done {
                finish_reason: FinishReason::Stop,
                usage: Some(Usage::new(Some(5), Some(3), Some(8))),
            },
        ]);
        let handle = provider.handle();
        let app = routes(state(provider));

        let response = app
            .oneshot(json_post(
                "/chat",
                r#"{"messages":[{"role":"user","content":"Hi"}]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );
        assert_eq!(response.headers()["x-vercel-ai-data-stream"], "v1");

        let body = body_string(response).await;
        let frames: Vec<&str> = body.lines().collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], "0:\"Hello\"");
        assert_eq!(frames[1], "0:\", world\"");
        assert!(frames[2].starts_with("d:"));
        let done: Value = serde_json::from_str(&frames[2][2..]).unwrap();
        assert_eq!(
            done,
            json!({"finishReason": "stop", "usage": {"promptTokens": 5, "completionTokens": 3}})
        );

        assert_eq!(handle.calls(), 1);
        assert!(handle.requests()[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_chat_with_tools_runs_tool() {
        let provider = MockProvider::new(vec![
            StreamEvent::ToolCall {
                id: "call_1".into(),
                name: "calculate".into(),
                arguments: json!({"expression": "156 * 23"}),
            },
            StreamEvent::done(FinishReason::ToolCalls),
        ]);
        let handle = provider.handle();
        let app = routes(state(provider));

        let response = app
            .oneshot(json_post(
                "/chat-with-tools",
                r#"{"messages":[{"role":"user","content":"What is 156 * 23?"}]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        let frames: Vec<&str> = body.lines().collect();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with("9:"));
        let result: Value = serde_json::from_str(frames[1].strip_prefix("a:").unwrap()).unwrap();
        assert_eq!(
            result,
            json!({"toolCallId": "call_1", "result": {"result": 3588, "expression": "156 * 23"}})
        );
        assert!(frames[2].starts_with("d:{"));
        assert_eq!(handle.requests()[0].tools.len(), 3);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_frames() {
        let provider = MockProvider::scripted(vec![
            MockStep::Event(StreamEvent::text("partial")),
            MockStep::Fail("upstream reset".into()),
        ]);
        let app = routes(state(provider));

        let response = app
            .oneshot(json_post(
                "/chat",
                r#"{"messages":[{"role":"user","content":"Hi"}]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        let frames: Vec<&str> = body.lines().collect();
        assert_eq!(frames[0], "0:\"partial\"");
        assert_eq!(frames[1], "3:\"upstream reset\"");
        let done: Value = serde_json::from_str(&frames[2][2..]).unwrap();
        assert_eq!(done["finishReason"], "error");
    }

    #[tokio::test]
    async fn test_malformed_requests_rejected() {
        let bodies = [
            "not json",
            r#"{"model":"gpt-5-mini"}"#,
            r#"{"messages":[]}"#,
            r#"{"messages":[{"role":"robot","content":"beep"}]}"#,
            r#"{"messages":[{"role":"user"}]}"#,
        ];

        for body in bodies {
            let provider = MockProvider::new(vec![]);
            let handle = provider.handle();
            let app = routes(state(provider));

            let response = app.oneshot(json_post("/chat", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);

            let payload: Value = serde_json::from_str(&body_string(response).await).unwrap();
            assert_eq!(payload["success"], false);
            assert!(payload["error"]
                .as_str()
                .unwrap()
                .starts_with("Malformed request"));
            assert_eq!(handle.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_upstream_rejection_is_server_error() {
        let app = routes(state(MockProvider::rejecting("Request failed (401 Unauthorized): bad key")));

        let response = app
            .oneshot(json_post(
                "/chat",
                r#"{"messages":[{"role":"user","content":"Hi"}]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(payload["success"], false);
        assert!(payload["error"].as_str().unwrap().contains("bad key"));
    }

    #[tokio::test]
    async fn test_dropping_body_cancels_upstream() {
        let provider = MockProvider::new(vec![StreamEvent::text("first")]).hanging();
        let handle = provider.handle();

        let response = routes(state(provider))
            .oneshot(json_post(
                "/chat",
                r#"{"messages":[{"role":"user","content":"Hi"}]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), "0:\"first\"\n");
        assert!(!handle.stream_dropped());

        // Client goes away mid-stream
        drop(body);

        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.stream_dropped() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("upstream stream was not released");
        assert!(handle.all_cancelled());
        assert_eq!(handle.calls(), 1);
    }
}
