pub mod calculator;
pub mod error;
pub mod executor;
pub mod expression;
pub mod knowledge;
pub mod registry;
pub mod weather;

pub use error::{ToolError, ToolResult};
pub use executor::ToolExecutor;
pub use registry::ToolRegistry;

/// The fixed set of tools offered on the tool-enabled chat endpoint
pub fn demo_registry() -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(weather::WeatherTool::new()))?;
    registry.register(Box::new(calculator::CalculatorTool::new()))?;
    registry.register(Box::new(knowledge::KnowledgeTool::new()))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_registry() {
        let registry = demo_registry().unwrap();
        let names: Vec<_> = registry.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["calculate", "getWeather", "searchKnowledge"]);
    }
}
