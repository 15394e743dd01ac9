use anyhow::{Context, Result};
use redis::aio::Connection;
use redis::{AsyncCommands, Client};

use crate::models::conversation::{
    render_recent_turns, ConversationTurn, MAX_TURNS_PER_CONVERSATION,
};

/// Conversation memory backed by Redis. Each conversation is a JSON
/// list of turns under `conversation:{id}`; appends rewrite the whole
/// list under a single SET, so a turn is never half-visible.
#[derive(Clone, Debug)]
pub struct RedisMemoryService {
    client: Client,
}

impl RedisMemoryService {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Get an async connection to Redis
    async fn get_connection(&self) -> Result<Connection> {
        let conn = self.client.get_async_connection().await?;
        Ok(conn)
    }

    fn key(conversation_id: &str) -> String {
        format!("conversation:{}", conversation_id)
    }

    async fn load_history(&self, conversation_id: &str) -> Result<Vec<ConversationTurn>> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = conn.get(Self::key(conversation_id)).await?;
        match raw {
            Some(serialized) => serde_json::from_str(&serialized)
                .context("Failed to deserialize conversation history"),
            None => Ok(Vec::new()),
        }
    }

    pub async fn enhance(&self, conversation_id: &str, text: &str) -> Result<String> {
        let history = self.load_history(conversation_id).await?;
        if history.is_empty() {
            return Ok(text.to_string());
        }
        Ok(format!(
            "{}\n\nRecent conversation:\n{}",
            text,
            render_recent_turns(&history)
        ))
    }

    pub async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<()> {
        let mut history = self.load_history(conversation_id).await?;
        history.push(turn);
        if history.len() > MAX_TURNS_PER_CONVERSATION {
            let excess = history.len() - MAX_TURNS_PER_CONVERSATION;
            history.drain(..excess);
        }

        let serialized = serde_json::to_string(&history)
            .context("Failed to serialize conversation history")?;
        let mut conn = self.get_connection().await?;
        conn.set::<_, _, ()>(Self::key(conversation_id), serialized).await?;
        Ok(())
    }
}
