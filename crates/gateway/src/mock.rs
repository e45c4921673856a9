//! Scripted gateway for tests
//!
//! Chat replies are queued ahead of time and popped in order; running off
//! the end of the script is an error so tests fail loudly instead of
//! looping. Embeddings are unavailable unless explicitly configured, which
//! exercises callers' offline fallbacks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{ChatReply, Gateway, GatewayError, Message, Result, Tool};

#[derive(Default)]
pub struct MockGateway {
    replies: Mutex<VecDeque<ChatReply>>,
    embedding: Option<Vec<f32>>,
    chat_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next chat reply
    pub fn push_reply(&self, reply: ChatReply) {
        self.replies
            .lock()
            .expect("mock reply queue poisoned")
            .push_back(reply);
    }

    pub fn with_replies(replies: impl IntoIterator<Item = ChatReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            embedding: None,
            chat_calls: AtomicUsize::new(0),
        }
    }

    /// Make `embed` return this fixed vector instead of failing
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Number of chat completions served so far
    pub fn chat_count(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn chat(&self, _messages: &[Message], _tools: &[Tool]) -> Result<ChatReply> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .expect("mock reply queue poisoned")
            .pop_front()
            .ok_or_else(|| GatewayError::Api("mock gateway: no scripted reply left".to_string()))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        match &self.embedding {
            Some(v) => Ok(v.clone()),
            None => Err(GatewayError::Api(
                "mock gateway: embeddings unavailable".to_string(),
            )),
        }
    }
}
