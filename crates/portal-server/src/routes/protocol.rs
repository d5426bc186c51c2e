use axum::{
    body::Body,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::Stream;
use portal::facade::ChatStream;
use portal::models::event::StreamEvent;
use portal::providers::base::Usage;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};

const DATA_STREAM_HEADER: HeaderName = HeaderName::from_static("x-vercel-ai-data-stream");

// Protocol-specific message formatting
pub struct ProtocolFormatter;

impl ProtocolFormatter {
    pub fn format(event: &StreamEvent) -> String {
        match event {
            StreamEvent::TextDelta { text } => Self::format_text(text),
            StreamEvent::ToolCall {
                id,
                name,
                arguments,
            } => Self::format_tool_call(id, name, arguments),
            StreamEvent::ToolResult { id, result, .. } => Self::format_tool_response(id, result),
            StreamEvent::Error { message } => Self::format_error(message),
            StreamEvent::Done {
                finish_reason,
                usage,
            } => Self::format_finish(finish_reason.as_str(), usage.as_ref()),
        }
    }

    fn format_text(text: &str) -> String {
        // Text parts start with "0:" and carry a JSON string
        format!("0:{}\n", Value::from(text))
    }

    fn format_tool_call(id: &str, name: &str, args: &Value) -> String {
        // Tool calls start with "9:"
        let tool_call = json!({
            "toolCallId": id,
            "toolName": name,
            "args": args
        });
        format!("9:{}\n", tool_call)
    }

    fn format_tool_response(id: &str, result: &Value) -> String {
        // Tool responses start with "a:"
        let response = json!({
            "toolCallId": id,
            "result": result,
        });
        format!("a:{}\n", response)
    }

    fn format_error(message: &str) -> String {
        format!("3:{}\n", Value::from(message))
    }

    fn format_finish(reason: &str, usage: Option<&Usage>) -> String {
        // Finish messages start with "d:"
        let usage = usage.cloned().unwrap_or_default();
        let finish = json!({
            "finishReason": reason,
            "usage": {
                "promptTokens": usage.input_tokens.unwrap_or(0),
                "completionTokens": usage.output_tokens.unwrap_or(0)
            }
        });
        format!("d:{}\n", finish)
    }
}

/// Response body in the Vercel AI data-stream protocol, one frame per event.
///
/// Dropping the response drops the underlying [`ChatStream`], which cancels
/// the request.
pub struct SseResponse {
    events: ChatStream,
}

impl SseResponse {
    pub fn new(events: ChatStream) -> Self {
        Self { events }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events)
            .poll_next(cx)
            .map(|opt| opt.map(|event| Ok(Bytes::from(ProtocolFormatter::format(&event)))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = Body::from_stream(self);
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
                (DATA_STREAM_HEADER, "v1"),
            ],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal::models::event::FinishReason;

    #[test]
    fn test_text_frame_is_json_string() {
        let frame = ProtocolFormatter::format(&StreamEvent::text("Say \"hi\"\n"));
        assert_eq!(frame, "0:\"Say \\\"hi\\\"\\n\"\n");
    }

    #[test]
    fn test_tool_frames() {
        let call = ProtocolFormatter::format(&StreamEvent::ToolCall {
            id: "call_1".into(),
            name: "getWeather".into(),
            arguments: json!({"location": "Paris"}),
        });
        assert!(call.starts_with("9:"));
        let body: Value = serde_json::from_str(call[2..].trim_end()).unwrap();
        assert_eq!(
            body,
            json!({"toolCallId": "call_1", "toolName": "getWeather", "args": {"location": "Paris"}})
        );

        let result = ProtocolFormatter::format(&StreamEvent::ToolResult {
            id: "call_1".into(),
            name: "getWeather".into(),
            result: json!({"temperature": 72}),
        });
        let body: Value = serde_json::from_str(result.strip_prefix("a:").unwrap().trim_end()).unwrap();
        assert_eq!(body, json!({"toolCallId": "call_1", "result": {"temperature": 72}}));
    }

    #[test]
    fn test_error_and_finish_frames() {
        let error = ProtocolFormatter::format(&StreamEvent::Error {
            message: "upstream reset".into(),
        });
        assert_eq!(error, "3:\"upstream reset\"\n");

        let done = ProtocolFormatter::format(&StreamEvent::Done {
            finish_reason: FinishReason::ToolCalls,
            usage: Some(Usage::new(Some(12), Some(30), Some(42))),
        });
        let body: Value = serde_json::from_str(done.strip_prefix("d:").unwrap().trim_end()).unwrap();
        assert_eq!(
            body,
            json!({"finishReason": "tool-calls", "usage": {"promptTokens": 12, "completionTokens": 30}})
        );

        let bare = ProtocolFormatter::format(&StreamEvent::done(FinishReason::Stop));
        let body: Value = serde_json::from_str(bare.strip_prefix("d:").unwrap().trim_end()).unwrap();
        assert_eq!(
            body,
            json!({"finishReason": "stop", "usage": {"promptTokens": 0, "completionTokens": 0}})
        );
    }
}
