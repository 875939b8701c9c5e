//! Conversation message types
//!
//! A message is either plain text or a list of content blocks. Blocks carry
//! tool-use requests from the assistant and tool results going back to it.

use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Content block inside a structured message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },

    /// Tool call requested by the assistant
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Result of a tool call, sent back on the user side
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// Message content: either simple text or structured blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

impl Message {
    /// User message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(MessageContent::Text(text.into())),
        }
    }

    /// Assistant message made of blocks
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(blocks)),
        }
    }

    /// User message carrying a batch of tool results
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Blocks(results)),
        }
    }

    /// Single successful tool result
    pub fn tool_result(tool_use_id: impl Into<String>, result: impl Into<String>) -> Self {
        Self::tool_results(vec![ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: result.into(),
            is_error: None,
        }])
    }

    /// Single failed tool result
    pub fn tool_error(tool_use_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::tool_results(vec![ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: error.into(),
            is_error: Some(true),
        }])
    }

    /// All text in the message, blocks joined with newlines
    pub fn text(&self) -> Option<String> {
        match &self.content {
            Some(MessageContent::Text(s)) => Some(s.clone()),
            Some(MessageContent::Blocks(blocks)) => {
                let parts: Vec<&str> = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("\n"))
                }
            }
            None => None,
        }
    }

    /// Tool-use blocks requested by the assistant
    pub fn tool_uses(&self) -> Vec<&ContentBlock> {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks
                .iter()
                .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
                .collect(),
            _ => vec![],
        }
    }

    pub fn has_tool_uses(&self) -> bool {
        !self.tool_uses().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_message() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text().as_deref(), Some("Hello"));
    }

    #[test]
    fn test_text_joins_blocks() {
        let msg = Message::assistant_blocks(vec![
            ContentBlock::Text {
                text: "first".to_string(),
            },
            ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "stock_news".to_string(),
                input: json!({"symbol": "AAPL"}),
            },
            ContentBlock::Text {
                text: "second".to_string(),
            },
        ]);

        assert_eq!(msg.text().as_deref(), Some("first\nsecond"));
        assert!(msg.has_tool_uses());
        assert_eq!(msg.tool_uses().len(), 1);
    }

    #[test]
    fn test_tool_only_message_has_no_text() {
        let msg = Message::assistant_blocks(vec![ContentBlock::ToolUse {
            id: "call_1".to_string(),
            name: "rsi".to_string(),
            input: json!({}),
        }]);
        assert!(msg.text().is_none());
    }

    #[test]
    fn test_tool_error_flag() {
        let msg = Message::tool_error("call_9", "boom");
        match msg.content {
            Some(MessageContent::Blocks(blocks)) => {
                assert!(matches!(
                    &blocks[0],
                    ContentBlock::ToolResult {
                        is_error: Some(true),
                        ..
                    }
                ));
            }
            _ => panic!("Expected blocks"),
        }
    }

    #[test]
    fn test_block_serialization_is_tagged() {
        let block = ContentBlock::Text {
            text: "hi".to_string(),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hi"}));
    }
}
