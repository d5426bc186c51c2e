use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};

use super::error::{ToolError, ToolResult};
use super::executor::ToolExecutor;
use crate::models::tool::Tool;

const TEMPERATURES: [i64; 6] = [65, 68, 72, 75, 78, 82];
const CONDITIONS: [&str; 4] = ["sunny", "partly cloudy", "cloudy", "rainy"];

/// Synthetic weather for demos; never calls a real weather service
pub struct WeatherTool {
    tool: Tool,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                "getWeather",
                "Get the weather for a location",
                json!({
                    "type": "object",
                    "properties": {
                        "location": {
                            "type": "string",
                            "description": "The city and state, e.g. San Francisco, CA"
                        }
                    },
                    "required": ["location"]
                }),
            ),
        }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

fn sample(location: &str) -> Value {
    let mut rng = rand::thread_rng();
    json!({
        "location": location,
        "temperature": TEMPERATURES.choose(&mut rng).copied().unwrap_or(72),
        "conditions": CONDITIONS.choose(&mut rng).copied().unwrap_or("sunny"),
        "humidity": rng.gen_range(40..80),
    })
}

#[async_trait]
impl ToolExecutor for WeatherTool {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let location = arguments
            .get("location")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParameters("location must be a string".into()))?;
        tracing::debug!(location, "sampling mock weather");
        Ok(sample(location))
    }
}
