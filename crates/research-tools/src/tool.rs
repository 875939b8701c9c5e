//! Tool trait

use async_trait::async_trait;
use research_core::{Error, Result};
use research_llm::ToolDefinition;
use serde_json::Value;

/// A capability an agent may invoke
///
/// Each tool exposes a unique name, a description the model reads to decide
/// when to call it, and the JSON Schema of its input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run the tool; `params` should match [`Tool::input_schema`]
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique name within a [`crate::ToolRegistry`]
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> Value;

    /// Definition advertised to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}

/// Read a required, non-blank string parameter
pub fn require_str<'a>(tool: &str, params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::invalid_input(tool, format!("missing string parameter '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_str() {
        let params = json!({"symbol": " AAPL ", "blank": "  ", "n": 3});
        assert_eq!(require_str("t", &params, "symbol").unwrap(), "AAPL");
        assert!(require_str("t", &params, "blank").is_err());
        assert!(require_str("t", &params, "n").is_err());
        assert!(matches!(
            require_str("t", &params, "missing"),
            Err(Error::InvalidToolInput { .. })
        ));
    }
}
