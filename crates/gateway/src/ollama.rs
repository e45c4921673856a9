//! Ollama-backed gateway
//!
//! Talks to an Ollama-compatible server: `/api/chat` for completions with
//! tool-call generation, `/api/embeddings` for vectors.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::{ChatReply, FunctionCall, Gateway, GatewayError, Message, Result, Tool, ToolCallDef};

const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(60);

/// Gateway over an Ollama-compatible HTTP endpoint
pub struct OllamaGateway {
    client: reqwest::Client,
    base_url: String,
    chat_model: String,
    embed_model: String,
    chat_timeout: Duration,
    embed_timeout: Duration,
}

impl OllamaGateway {
    pub fn new(
        base_url: impl Into<String>,
        chat_model: impl Into<String>,
        embed_model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chat_model: chat_model.into(),
            embed_model: embed_model.into(),
            chat_timeout: DEFAULT_CHAT_TIMEOUT,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    /// Override the default request timeouts
    pub fn with_timeouts(mut self, chat: Duration, embed: Duration) -> Self {
        self.chat_timeout = chat;
        self.embed_timeout = embed;
        self
    }

    fn build_chat_request(&self, messages: &[Message], tools: &[Tool]) -> Value {
        let mut body = json!({
            "model": self.chat_model,
            "messages": messages,
            "stream": false,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        body
    }

    fn parse_chat_response(value: &Value) -> Result<ChatReply> {
        if let Some(err) = value.get("error").and_then(|e| e.as_str()) {
            return Err(GatewayError::Api(err.to_string()));
        }

        let message = value
            .get("message")
            .ok_or_else(|| GatewayError::Parse("missing message field".to_string()))?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();

        let mut tool_calls = Vec::new();
        if let Some(calls) = message.get("tool_calls").and_then(|t| t.as_array()) {
            for call in calls {
                let function = call
                    .get("function")
                    .ok_or_else(|| GatewayError::Parse("tool call without function".to_string()))?;
                let name = function
                    .get("name")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| GatewayError::Parse("tool call without name".to_string()))?
                    .to_string();
                let arguments = function.get("arguments").cloned().unwrap_or(json!({}));
                tool_calls.push(ToolCallDef {
                    function: FunctionCall { name, arguments },
                });
            }
        }

        Ok(ChatReply { content, tool_calls })
    }
}

#[async_trait]
impl Gateway for OllamaGateway {
    async fn chat(&self, messages: &[Message], tools: &[Tool]) -> Result<ChatReply> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_chat_request(messages, tools);
        debug!("chat request to {} ({} messages)", url, messages.len());

        let response = self
            .client
            .post(&url)
            .timeout(self.chat_timeout)
            .json(&body)
            .send()
            .await?;

        let value: Value = response.json().await?;
        Self::parse_chat_response(&value)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = json!({
            "model": self.embed_model,
            "prompt": text,
        });

        let response = self
            .client
            .post(&url)
            .timeout(self.embed_timeout)
            .json(&body)
            .send()
            .await?;

        let value: Value = response.json().await?;
        if let Some(err) = value.get("error").and_then(|e| e.as_str()) {
            return Err(GatewayError::Api(err.to_string()));
        }

        let embedding = value
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| GatewayError::Parse("missing embedding field".to_string()))?;

        Ok(embedding
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|v| v as f32)
            .collect())
    }
}
