pub mod ai;
pub mod analytical;
pub mod conversational;
#[cfg(feature = "external-services")]
pub mod database;
pub mod insight;
pub mod memory_conversation;
pub mod memory_sql;
pub mod memory_vector;
pub mod pipeline;
#[cfg(feature = "external-services")]
pub mod redis;
pub mod router;
pub mod semantic;
#[cfg(test)]
pub mod testing;
pub mod tools;
#[cfg(feature = "external-services")]
pub mod vector;
pub mod visualization;

use anyhow::Result;

use crate::models::conversation::ConversationTurn;
use crate::models::response::{ErrorKind, ResultRow};

/// What an intent handler produces: a result set or a textual answer,
/// plus a user-facing status message. Failures are folded in here;
/// handlers never propagate errors to the pipeline.
#[derive(Debug, Clone)]
pub struct HandlerOutput {
    pub results: Vec<ResultRow>,
    pub sql_query: Option<String>,
    pub message: String,
    pub error: Option<ErrorKind>,
}

impl HandlerOutput {
    pub fn rows(results: Vec<ResultRow>, message: impl Into<String>) -> Self {
        Self {
            results,
            sql_query: None,
            message: message.into(),
            error: None,
        }
    }

    pub fn failure(error: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            sql_query: None,
            message: message.into(),
            error: Some(error),
        }
    }
}

// Define traits for service functionality

/// External AI capabilities: intent classification, text/SQL generation
/// and text embedding.
#[async_trait::async_trait]
pub trait AiServiceTrait: Send + Sync + 'static {
    async fn classify(&self, prompt: &str) -> Result<String>;
    async fn generate(&self, prompt: &str) -> Result<String>;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Read-only access to the relational store
#[async_trait::async_trait]
pub trait SqlServiceTrait: Send + Sync + 'static {
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>>;
    async fn fetch_schema(&self) -> Result<String>;
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ResultRow>>;
}

/// Nearest-neighbour search over the embedding store.
/// Returns `(id, score)` pairs with scores descending.
#[async_trait::async_trait]
pub trait VectorServiceTrait: Send + Sync + 'static {
    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<(String, f32)>>;
}

/// Conversation memory keyed by conversation id, append-only
#[async_trait::async_trait]
pub trait MemoryServiceTrait: Send + Sync + 'static {
    async fn enhance(&self, conversation_id: &str, text: &str) -> Result<String>;
    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<()>;
}

// Implement the traits for both real and memory services

#[async_trait::async_trait]
impl AiServiceTrait for ai::AiService {
    async fn classify(&self, prompt: &str) -> Result<String> {
        self.classify(prompt).await
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text).await
    }
}

#[cfg(feature = "external-services")]
#[async_trait::async_trait]
impl SqlServiceTrait for database::PostgresService {
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>> {
        self.execute(sql).await
    }

    async fn fetch_schema(&self) -> Result<String> {
        self.fetch_schema().await
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ResultRow>> {
        self.fetch_by_ids(ids).await
    }
}

#[async_trait::async_trait]
impl SqlServiceTrait for memory_sql::MemorySqlService {
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>> {
        self.execute(sql).await
    }

    async fn fetch_schema(&self) -> Result<String> {
        self.fetch_schema().await
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ResultRow>> {
        self.fetch_by_ids(ids).await
    }
}

#[cfg(feature = "external-services")]
#[async_trait::async_trait]
impl VectorServiceTrait for vector::ChromaService {
    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        self.search(embedding, k).await
    }
}

#[async_trait::async_trait]
impl VectorServiceTrait for memory_vector::MemoryVectorService {
    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        self.search(embedding, k).await
    }
}

#[cfg(feature = "external-services")]
#[async_trait::async_trait]
impl MemoryServiceTrait for redis::RedisMemoryService {
    async fn enhance(&self, conversation_id: &str, text: &str) -> Result<String> {
        self.enhance(conversation_id, text).await
    }

    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<()> {
        self.append(conversation_id, turn).await
    }
}

#[async_trait::async_trait]
impl MemoryServiceTrait for memory_conversation::MemoryConversationService {
    async fn enhance(&self, conversation_id: &str, text: &str) -> Result<String> {
        self.enhance(conversation_id, text).await
    }

    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<()> {
        self.append(conversation_id, turn).await
    }
}

// Re-export the services
pub use ai::AiService;
#[cfg(feature = "external-services")]
pub use database::PostgresService;
pub use pipeline::QueryPipeline;
#[cfg(feature = "external-services")]
pub use redis::RedisMemoryService;
#[cfg(feature = "external-services")]
pub use vector::ChromaService;
