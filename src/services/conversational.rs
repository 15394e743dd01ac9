use log::warn;

use crate::models::query::Query;
use crate::models::response::ErrorKind;
use crate::services::{AiServiceTrait, HandlerOutput, MemoryServiceTrait};

/// Handles conversational queries: a direct natural-language reply
/// with no data retrieval. Zero rows, reply as message.
#[derive(Clone, Debug)]
pub struct ConversationalHandler<A, M>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
    M: MemoryServiceTrait + Clone + std::fmt::Debug,
{
    ai_service: A,
    memory_service: M,
}

impl<A, M> ConversationalHandler<A, M>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
    M: MemoryServiceTrait + Clone + std::fmt::Debug,
{
    pub fn new(ai_service: A, memory_service: M) -> Self {
        Self {
            ai_service,
            memory_service,
        }
    }

    pub async fn handle(&self, query: &Query) -> HandlerOutput {
        let text = match self
            .memory_service
            .enhance(&query.conversation_id, &query.raw_text)
            .await
        {
            Ok(enhanced) => enhanced,
            Err(e) => {
                warn!("Memory enhancement failed, using raw query text: {}", e);
                query.raw_text.clone()
            }
        };

        let prompt = format!(
            "You are a friendly assistant for an e-commerce analytics chat. \
             Reply briefly and helpfully to the user's message:\n\n{}",
            text
        );

        match self.ai_service.generate(&prompt).await {
            Ok(reply) => HandlerOutput::rows(Vec::new(), reply),
            Err(e) => HandlerOutput::failure(
                ErrorKind::GenerationFailure,
                format!("Sorry, I could not come up with a reply: {}", e),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_conversation::MemoryConversationService;
    use crate::services::testing::MockAi;

    fn query(text: &str) -> Query {
        Query {
            raw_text: text.to_string(),
            conversation_id: "c1".to_string(),
            user_id: "u1".to_string(),
        }
    }

    #[actix_web::test]
    async fn replies_with_zero_rows() {
        let ai = MockAi::new().generating(&["Hello! Ask me about your sales data."]);
        let handler = ConversationalHandler::new(ai, MemoryConversationService::new());

        let output = handler.handle(&query("hello")).await;
        assert!(output.results.is_empty());
        assert_eq!(output.message, "Hello! Ask me about your sales data.");
        assert!(output.error.is_none());
    }

    #[actix_web::test]
    async fn generation_failure_degrades() {
        let handler = ConversationalHandler::new(MockAi::new(), MemoryConversationService::new());

        let output = handler.handle(&query("hello")).await;
        assert!(output.results.is_empty());
        assert_eq!(output.error, Some(ErrorKind::GenerationFailure));
        assert!(!output.message.is_empty());
    }
}
