use async_trait::async_trait;
use serde_json::{json, Value};

use super::error::{ToolError, ToolResult};
use super::executor::ToolExecutor;
use crate::models::tool::Tool;

const TOPICS: [(&str, &str); 4] = [
    (
        "portal ai",
        "PORTAL AI provides type-safe AI development with multi-provider support.",
    ),
    (
        "portal query",
        "PORTAL Query offers powerful data fetching with caching and real-time updates.",
    ),
    (
        "portal form",
        "PORTAL Form delivers intuitive form management with validation.",
    ),
    (
        "streaming",
        "PORTAL supports real-time streaming responses for better UX.",
    ),
];

pub struct KnowledgeTool {
    tool: Tool,
}

impl KnowledgeTool {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                "searchKnowledge",
                "Searches PORTAL documentation and knowledge base",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        }
                    },
                    "required": ["query"]
                }),
            ),
        }
    }
}

impl Default for KnowledgeTool {
    fn default() -> Self {
        Self::new()
    }
}

pub fn lookup(query: &str) -> String {
    let query_lower = query.to_lowercase();
    TOPICS
        .iter()
        .find(|(topic, _)| query_lower.contains(topic))
        .map(|(_, answer)| answer.to_string())
        .unwrap_or_else(|| {
            format!(
                "Documentation for \"{}\" is available in the PORTAL knowledge base.",
                query
            )
        })
}

#[async_trait]
impl ToolExecutor for KnowledgeTool {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParameters("query must be a string".into()))?;
        Ok(json!({ "query": query, "result": lookup(query) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(
            lookup("How does PORTAL Query cache?"),
            "PORTAL Query offers powerful data fetching with caching and real-time updates."
        );
        assert_eq!(
            lookup("agents"),
            "Documentation for \"agents\" is available in the PORTAL knowledge base."
        );
    }

    #[tokio::test]
    async fn test_search_call() {
        let result = KnowledgeTool::new()
            .call(json!({"query": "Streaming tips"}))
            .await
            .unwrap();
        assert_eq!(result["query"], "Streaming tips");
        assert_eq!(
            result["result"],
            "PORTAL supports real-time streaming responses for better UX."
        );
    }
}
