use anyhow::{anyhow, Result};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::collections::BTreeMap;

use super::error::{ToolError, ToolResult};
use super::executor::ToolExecutor;
use crate::models::tool::Tool;
use crate::providers::utils::is_valid_function_name;

struct RegisteredTool {
    executor: Box<dyn ToolExecutor>,
    schema: JSONSchema,
}

/// Tools available to one kind of request, keyed by unique name.
///
/// A registry is built once at startup and only read afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, executor: Box<dyn ToolExecutor>) -> Result<()> {
        let name = executor.tool().name.clone();
        // Upstream function names are restricted; anything else could never be dispatched back
        if !is_valid_function_name(&name) {
            return Err(anyhow!("Invalid tool name: {}", name));
        }
        if self.tools.contains_key(&name) {
            return Err(anyhow!("Duplicate tool name: {}", name));
        }

        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&executor.tool().parameters)
            .map_err(|e| anyhow!("Invalid parameter schema for {}: {}", name, e))?;

        self.tools
            .insert(name, RegisteredTool { executor, schema });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Descriptors of every registered tool, ordered by name
    pub fn tools(&self) -> Vec<Tool> {
        self.tools
            .values()
            .map(|registered| registered.executor.tool().clone())
            .collect()
    }

    /// Validate the arguments against the tool's schema, then run it
    pub async fn call(&self, name: &str, arguments: Value) -> ToolResult<Value> {
        let registered = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;

        if let Err(errors) = registered.schema.validate(&arguments) {
            let details: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(ToolError::InvalidParameters(details.join("; ")));
        }

        registered.executor.call(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool {
        tool: Tool,
    }

    impl EchoTool {
        fn new(name: &str) -> Self {
            Self {
                tool: Tool::new(
                    name,
                    "Echo the input back",
                    json!({
                        "type": "object",
                        "properties": {"input": {"type": "string"}},
                        "required": ["input"]
                    }),
                ),
            }
        }
    }

    #[async_trait]
    impl ToolExecutor for EchoTool {
        fn tool(&self) -> &Tool {
            &self.tool
        }

        async fn call(&self, arguments: Value) -> ToolResult<Value> {
            Ok(json!({ "echo": arguments["input"] }))
        }
    }

    #[tokio::test]
    async fn test_call_validates_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::new("echo"))).unwrap();

        let result = registry.call("echo", json!({"input": "hi"})).await.unwrap();
        assert_eq!(result, json!({"echo": "hi"}));

        let err = registry.call("echo", json!({"input": 3})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));

        let err = registry.call("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(ref msg) if msg.contains("input")));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.len(), 0);
        assert_eq!(
            registry.call("nope", json!({})).await.unwrap_err(),
            ToolError::ToolNotFound("nope".to_string())
        );
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::new("echo"))).unwrap();
        let err = registry.register(Box::new(EchoTool::new("echo"))).unwrap_err();
        assert!(err.to_string().contains("Duplicate tool name"));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("echo"));
    }

    #[test]
    fn test_rejects_names_the_model_cannot_call() {
        let mut registry = ToolRegistry::new();
        for name in ["get weather", "tools.weather", ""] {
            let err = registry.register(Box::new(EchoTool::new(name))).unwrap_err();
            assert!(err.to_string().contains("Invalid tool name"));
        }
        assert_eq!(registry.len(), 0);

        registry.register(Box::new(EchoTool::new("get_weather-v2"))).unwrap();
        assert!(registry.contains("get_weather-v2"));
    }
}
