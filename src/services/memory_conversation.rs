use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::models::conversation::{
    render_recent_turns, ConversationTurn, MAX_TURNS_PER_CONVERSATION,
};

/// In-memory conversation memory: append-only turn lists keyed by
/// conversation id, capped at `MAX_TURNS_PER_CONVERSATION`.
#[derive(Clone, Debug)]
pub struct MemoryConversationService {
    conversations: Arc<Mutex<HashMap<String, Vec<ConversationTurn>>>>,
}

impl MemoryConversationService {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Augment a query with recent conversation context. Returns the
    /// text unchanged when the conversation has no history.
    pub async fn enhance(&self, conversation_id: &str, text: &str) -> Result<String> {
        let conversations = self
            .conversations
            .lock()
            .map_err(|_| anyhow!("Failed to lock conversations"))?;

        match conversations.get(conversation_id) {
            Some(history) if !history.is_empty() => Ok(format!(
                "{}\n\nRecent conversation:\n{}",
                text,
                render_recent_turns(history)
            )),
            _ => Ok(text.to_string()),
        }
    }

    /// Append one turn. Each append is atomic: concurrent readers
    /// never observe a partially written turn.
    pub async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<()> {
        let mut conversations = self
            .conversations
            .lock()
            .map_err(|_| anyhow!("Failed to lock conversations"))?;

        let history = conversations.entry(conversation_id.to_string()).or_default();
        history.push(turn);
        if history.len() > MAX_TURNS_PER_CONVERSATION {
            let excess = history.len() - MAX_TURNS_PER_CONVERSATION;
            history.drain(..excess);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn enhance_without_history_is_identity() {
        let service = MemoryConversationService::new();
        let enhanced = service.enhance("c1", "top products").await.unwrap();
        assert_eq!(enhanced, "top products");
    }

    #[actix_web::test]
    async fn enhance_appends_recent_context() {
        let service = MemoryConversationService::new();
        service.append("c1", ConversationTurn::user("show revenue by state")).await.unwrap();
        service.append("c1", ConversationTurn::assistant("Found 27 rows")).await.unwrap();

        let enhanced = service.enhance("c1", "and by city?").await.unwrap();
        assert!(enhanced.starts_with("and by city?"));
        assert!(enhanced.contains("show revenue by state"));
        assert!(enhanced.contains("Found 27 rows"));
    }

    #[actix_web::test]
    async fn history_is_isolated_per_conversation() {
        let service = MemoryConversationService::new();
        service.append("c1", ConversationTurn::user("hello")).await.unwrap();

        let enhanced = service.enhance("c2", "hi").await.unwrap();
        assert_eq!(enhanced, "hi");
    }

    #[actix_web::test]
    async fn history_is_capped() {
        let service = MemoryConversationService::new();
        for i in 0..(MAX_TURNS_PER_CONVERSATION + 10) {
            service
                .append("c1", ConversationTurn::user(format!("turn {}", i)))
                .await
                .unwrap();
        }

        let conversations = service.conversations.lock().unwrap();
        let history = conversations.get("c1").unwrap();
        assert_eq!(history.len(), MAX_TURNS_PER_CONVERSATION);
        assert_eq!(history.last().unwrap().content, format!("turn {}", MAX_TURNS_PER_CONVERSATION + 9));
    }
}
