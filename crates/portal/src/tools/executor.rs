use async_trait::async_trait;
use serde_json::Value;

use super::error::ToolResult;
use crate::models::tool::Tool;

/// A tool the facade can run on behalf of the model
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Name, description and argument schema offered to the model
    fn tool(&self) -> &Tool;

    /// Run the tool. Arguments have already been checked against the tool's schema.
    async fn call(&self, arguments: Value) -> ToolResult<Value>;
}
