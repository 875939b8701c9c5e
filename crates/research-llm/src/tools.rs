//! Tool definitions for function calling

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Must match the name the tool is registered under
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool's input
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// JSON Schema building helpers
///
/// ```
/// use research_llm::tools::schema;
/// use serde_json::json;
///
/// let input = schema::object(
///     json!({
///         "symbol": schema::string("Ticker symbol"),
///         "period": schema::enumeration("Lookback", &["1mo", "3mo"]),
///     }),
///     &["symbol"],
/// );
/// assert_eq!(input["required"][0], "symbol");
/// ```
pub mod schema {
    use serde_json::{Value, json};

    /// Object with the given properties
    pub fn object(properties: Value, required: &[&str]) -> Value {
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Object that forbids additional properties and requires every listed field
    pub fn strict_object(properties: Value, required: &[&str]) -> Value {
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn string(description: &str) -> Value {
        json!({
            "type": "string",
            "description": description,
        })
    }

    /// String restricted to a fixed set of values
    pub fn enumeration(description: &str, values: &[&str]) -> Value {
        json!({
            "type": "string",
            "description": description,
            "enum": values,
        })
    }

    pub fn number(description: &str) -> Value {
        json!({
            "type": "number",
            "description": description,
        })
    }

    /// Number within an inclusive range
    pub fn bounded_number(description: &str, minimum: f64, maximum: f64) -> Value {
        json!({
            "type": "number",
            "description": description,
            "minimum": minimum,
            "maximum": maximum,
        })
    }

    pub fn integer(description: &str) -> Value {
        json!({
            "type": "integer",
            "description": description,
        })
    }

    pub fn array(description: &str, items: Value) -> Value {
        json!({
            "type": "array",
            "description": description,
            "items": items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_definition_creation() {
        let input = schema::object(json!({"symbol": schema::string("Ticker")}), &["symbol"]);
        let tool = ToolDefinition::new("stock_price", "Price history", input.clone());
        assert_eq!(tool.name, "stock_price");
        assert_eq!(tool.input_schema, input);
    }

    #[test]
    fn test_strict_object_forbids_extra_fields() {
        let s = schema::strict_object(json!({"a": schema::number("a")}), &["a"]);
        assert_eq!(s["additionalProperties"], false);
        assert_eq!(s["required"], json!(["a"]));
    }

    #[test]
    fn test_enumeration_and_bounds() {
        let e = schema::enumeration("trend", &["up", "down", "sideways"]);
        assert_eq!(e["enum"].as_array().map(Vec::len), Some(3));

        let b = schema::bounded_number("score", 0.0, 100.0);
        assert_eq!(b["minimum"], 0.0);
        assert_eq!(b["maximum"], 100.0);
    }
}
