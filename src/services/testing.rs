//! Mock services shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::services::AiServiceTrait;

/// Scripted capability provider. `classify` returns a fixed reply,
/// `generate` pops scripted replies in order; an unset reply means
/// the call fails. An optional delay simulates a hung provider.
#[derive(Clone, Debug, Default)]
pub struct MockAi {
    pub classify_reply: Option<String>,
    pub generate_replies: Arc<Mutex<VecDeque<String>>>,
    pub embedding: Option<Vec<f32>>,
    pub delay: Option<Duration>,
}

impl MockAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classifying(mut self, reply: &str) -> Self {
        self.classify_reply = Some(reply.to_string());
        self
    }

    pub fn generating(self, replies: &[&str]) -> Self {
        {
            let mut queue = self.generate_replies.lock().unwrap();
            for reply in replies {
                queue.push_back(reply.to_string());
            }
        }
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn maybe_delay(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl AiServiceTrait for MockAi {
    async fn classify(&self, _prompt: &str) -> Result<String> {
        self.maybe_delay().await;
        self.classify_reply
            .clone()
            .ok_or_else(|| anyhow!("mock classify failure"))
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.maybe_delay().await;
        self.generate_replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("mock generate failure"))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.maybe_delay().await;
        self.embedding
            .clone()
            .ok_or_else(|| anyhow!("mock embed failure"))
    }
}

/// Build a result row from column/value pairs
pub fn row(pairs: &[(&str, serde_json::Value)]) -> crate::models::response::ResultRow {
    let mut row = crate::models::response::ResultRow::new();
    for (k, v) in pairs {
        row.insert(k.to_string(), v.clone());
    }
    row
}
