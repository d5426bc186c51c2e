use async_trait::async_trait;
use serde_json::{json, Value};

use super::error::{ToolError, ToolResult};
use super::executor::ToolExecutor;
use super::expression;
use crate::models::tool::Tool;

// Largest integer an f64 holds exactly
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

pub struct CalculatorTool {
    tool: Tool,
}

impl CalculatorTool {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                "calculate",
                "Performs mathematical calculations",
                json!({
                    "type": "object",
                    "properties": {
                        "expression": {
                            "type": "string",
                            "description": "The mathematical expression to evaluate, e.g. 2 + 2 or 156 * 23"
                        }
                    },
                    "required": ["expression"]
                }),
            ),
        }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[async_trait]
impl ToolExecutor for CalculatorTool {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let expression = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParameters("expression must be a string".into()))?;

        // Unparseable input is reported in the result, not as a failed call
        match expression::evaluate(expression) {
            Ok(result) => Ok(json!({
                "result": number(result),
                "expression": expression,
            })),
            Err(e) => {
                tracing::debug!(expression, "rejected expression: {}", e);
                Ok(json!({
                    "error": "Invalid expression",
                    "expression": expression,
                }))
            }
        }
    }
}
