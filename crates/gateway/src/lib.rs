//! Inference gateway contract
//!
//! The agent consumes a language-model service through two calls: chat
//! completion with tool-call generation, and text embedding. This crate
//! defines the wire types, the [`Gateway`] trait, an Ollama-backed
//! implementation, and a scriptable mock for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod mock;
pub mod ollama;

pub use mock::MockGateway;
pub use ollama::OllamaGateway;

/// Errors from the inference gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned an error: {0}")]
    Api(String),

    #[error("unexpected gateway response: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// A chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A tool advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDef,
}

/// Function definition within a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Build a function tool declaration
pub fn function_tool(
    name: impl Into<String>,
    description: impl Into<String>,
    parameters: serde_json::Value,
) -> Tool {
    Tool {
        kind: "function".to_string(),
        function: FunctionDef {
            name: name.into(),
            description: description.into(),
            parameters,
        },
    }
}

/// A tool call proposed by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallDef {
    pub function: FunctionCall,
}

/// The function part of a proposed tool call; arguments arrive as a
/// structured object, not an encoded string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// One chat completion: free text, tool calls, or both
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub tool_calls: Vec<ToolCallDef>,
}

impl ChatReply {
    /// A free-text reply
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A reply proposing a single tool call
    pub fn tool(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            content: String::new(),
            tool_calls: vec![ToolCallDef {
                function: FunctionCall {
                    name: name.into(),
                    arguments,
                },
            }],
        }
    }
}

/// The inference service contract consumed by the agent
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Request a chat completion, advertising the given tools
    async fn chat(&self, messages: &[Message], tools: &[Tool]) -> Result<ChatReply>;

    /// Embed a text into a fixed-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("a").role, "system");
        assert_eq!(Message::user("b").role, "user");
        assert_eq!(Message::assistant("c").role, "assistant");
        assert_eq!(Message::user("hello").content, "hello");
    }

    #[test]
    fn test_function_tool_shape() {
        let tool = function_tool("shell", "Run a command", json!({"type": "object"}));
        assert_eq!(tool.kind, "function");
        assert_eq!(tool.function.name, "shell");

        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "shell");
        assert_eq!(value["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_chat_reply_tool() {
        let reply = ChatReply::tool("read_file", json!({"path": "notes.txt"}));
        assert!(reply.content.is_empty());
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].function.name, "read_file");
        assert_eq!(reply.tool_calls[0].function.arguments["path"], "notes.txt");
    }

    #[test]
    fn test_chat_reply_text() {
        let reply = ChatReply::text("done");
        assert_eq!(reply.content, "done");
        assert!(reply.tool_calls.is_empty());
    }
}
