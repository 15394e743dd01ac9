use log::{info, warn};
use serde_json::Value;

use crate::models::query::{Intent, Query};
use crate::services::ai::strip_code_fences;
use crate::services::AiServiceTrait;

/// Classifies a raw query into exactly one intent.
///
/// Fail-open: provider errors and unrecognized labels degrade to
/// `conversational` so a routing mistake becomes a chat answer rather
/// than an aborted request.
#[derive(Clone, Debug)]
pub struct IntentRouter<A>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
{
    ai_service: A,
}

impl<A> IntentRouter<A>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
{
    pub fn new(ai_service: A) -> Self {
        Self { ai_service }
    }

    pub async fn classify(&self, query: &Query) -> Intent {
        let prompt = build_classification_prompt(&query.raw_text);

        let response = match self.ai_service.classify(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Intent classification failed, falling back to conversational: {}", e);
                return Intent::Conversational;
            }
        };

        let intent = parse_intent_reply(&response).unwrap_or_else(|| {
            warn!("Unrecognized intent reply, falling back to conversational: {}", response);
            Intent::Conversational
        });

        info!("Classified query as '{}'", intent);
        intent
    }
}

fn parse_intent_reply(response: &str) -> Option<Intent> {
    let cleaned = strip_code_fences(response);
    let parsed: Value = serde_json::from_str(cleaned).ok()?;
    Intent::from_label(parsed.get("intent")?.as_str()?)
}

fn build_classification_prompt(query_text: &str) -> String {
    format!(
        r#"You are an intent classification system for an e-commerce analytics assistant.

Classify the user's query into exactly one of four intents:

1. "analytical": needs a SQL query over the database - aggregations, rankings, totals, trends.
   Signals: superlatives and aggregates such as "top", "highest", "total", "average", "count".
   Examples: "Top 5 best selling products", "Total sales last month", "Revenue by state".

2. "semantic": needs meaning-based retrieval over product descriptions and reviews.
   Signals: evaluative adjectives such as "good", "bad", "reliable", "quality".
   Examples: "good products", "bad reviews", "reliable sellers".

3. "tool": needs an external lookup - definitions, encyclopedia facts, or translation.
   Examples: "what is 'boleto'?", "translate this to English", "what does 'frete' mean?".

4. "conversational": greetings and anything that fits none of the above.
   Examples: "Hello", "Thank you", "What can you do?".

USER QUERY:
"{}"

Return ONLY a valid JSON object with this exact structure:
{{"intent": "analytical" | "semantic" | "tool" | "conversational"}}

No additional text or markdown formatting."#,
        query_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::MockAi;

    fn query(text: &str) -> Query {
        Query {
            raw_text: text.to_string(),
            conversation_id: "c1".to_string(),
            user_id: "u1".to_string(),
        }
    }

    #[actix_web::test]
    async fn classifies_from_json_reply() {
        let router = IntentRouter::new(MockAi::new().classifying(r#"{"intent": "analytical"}"#));
        assert_eq!(router.classify(&query("top 5 products")).await, Intent::Analytical);
    }

    #[actix_web::test]
    async fn strips_fences_before_parsing() {
        let router = IntentRouter::new(
            MockAi::new().classifying("```json\n{\"intent\": \"semantic\"}\n```"),
        );
        assert_eq!(router.classify(&query("good products")).await, Intent::Semantic);
    }

    #[actix_web::test]
    async fn garbage_reply_falls_back_to_conversational() {
        let router = IntentRouter::new(MockAi::new().classifying("I think this is about SQL"));
        assert_eq!(router.classify(&query("top 5")).await, Intent::Conversational);
    }

    #[actix_web::test]
    async fn unknown_label_falls_back_to_conversational() {
        let router = IntentRouter::new(MockAi::new().classifying(r#"{"intent": "sql"}"#));
        assert_eq!(router.classify(&query("top 5")).await, Intent::Conversational);
    }

    #[actix_web::test]
    async fn provider_failure_falls_back_to_conversational() {
        let router = IntentRouter::new(MockAi::new());
        assert_eq!(router.classify(&query("top 5")).await, Intent::Conversational);
    }
}
