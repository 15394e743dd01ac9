use anyhow::{anyhow, Result};
use log::{info, warn};
use reqwest::Client;
use serde_json::Value;

use crate::models::query::Query;
use crate::models::response::{ErrorKind, ResultRow};
use crate::services::ai::strip_code_fences;
use crate::services::{AiServiceTrait, HandlerOutput};

const WIKIPEDIA_API_BASE: &str = "https://en.wikipedia.org/api/rest_v1";
const SUMMARY_MAX_CHARS: usize = 500;

/// Sub-requests the tool handler can dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
enum ToolRequest {
    Definition(String),
    Encyclopedia(String),
    Translation(String),
}

/// Handles tool queries: recognizes the sub-request (definition,
/// encyclopedia lookup, translation) and calls the corresponding
/// external API. Produces a single-row text result, not a table.
#[derive(Clone, Debug)]
pub struct ToolHandler<A>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
{
    ai_service: A,
    client: Client,
    wikipedia_base: String,
}

impl<A> ToolHandler<A>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
{
    pub fn new(ai_service: A) -> Self {
        Self {
            ai_service,
            client: Client::new(),
            wikipedia_base: WIKIPEDIA_API_BASE.to_string(),
        }
    }

    #[allow(dead_code)]
    pub fn with_wikipedia_base(mut self, base_url: String) -> Self {
        self.wikipedia_base = base_url;
        self
    }

    pub async fn handle(&self, query: &Query) -> HandlerOutput {
        let request = match self.recognize(&query.raw_text).await {
            Ok(request) => request,
            Err(e) => {
                return HandlerOutput::failure(
                    ErrorKind::ToolFailure,
                    format!("Could not work out which lookup to perform: {}", e),
                );
            }
        };
        info!("Tool handler dispatching {:?}", request);

        let answer = match &request {
            ToolRequest::Definition(term) => self.define(term).await,
            ToolRequest::Encyclopedia(topic) => self.wikipedia_summary(topic).await,
            ToolRequest::Translation(text) => {
                self.ai_service.generate(&translation_prompt(text)).await
            }
        };

        match answer {
            Ok(text) => {
                let mut row = ResultRow::new();
                row.insert("text".to_string(), Value::from(text.clone()));
                HandlerOutput {
                    results: vec![row],
                    sql_query: None,
                    message: text,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Tool lookup failed: {}", e);
                HandlerOutput::failure(ErrorKind::ToolFailure, format!("The lookup failed: {}", e))
            }
        }
    }

    /// Ask the provider which tool the query needs and what argument
    /// to pass it.
    async fn recognize(&self, query_text: &str) -> Result<ToolRequest> {
        let prompt = format!(
            r#"The user asked for an external lookup. Decide which tool applies:

- "definition": define a domain term (e.g. "what is 'boleto'?")
- "encyclopedia": look up a topic on Wikipedia (e.g. "tell me about Sao Paulo")
- "translation": translate text to English (e.g. "translate 'frete gratis'")

USER QUERY:
"{}"

Return ONLY a valid JSON object: {{"tool": "definition" | "encyclopedia" | "translation", "argument": "<the term, topic or text>"}}"#,
            query_text
        );

        let response = self.ai_service.classify(&prompt).await?;
        let parsed: Value = serde_json::from_str(strip_code_fences(&response))
            .map_err(|e| anyhow!("Tool reply was not valid JSON: {}", e))?;

        let argument = parsed
            .get("argument")
            .and_then(|v| v.as_str())
            .unwrap_or(query_text)
            .to_string();

        match parsed.get("tool").and_then(|v| v.as_str()) {
            Some("definition") => Ok(ToolRequest::Definition(argument)),
            Some("encyclopedia") => Ok(ToolRequest::Encyclopedia(argument)),
            Some("translation") => Ok(ToolRequest::Translation(argument)),
            other => Err(anyhow!("Unknown tool '{:?}'", other)),
        }
    }

    async fn define(&self, term: &str) -> Result<String> {
        let prompt = format!(
            "In the context of Brazilian e-commerce, define this term simply: {}. \
             For example, 'boleto' is a Brazilian payment method.",
            term
        );
        self.ai_service.generate(&prompt).await
    }

    /// Fetch a Wikipedia summary for a topic, truncated to keep the
    /// answer chat-sized.
    async fn wikipedia_summary(&self, topic: &str) -> Result<String> {
        let url = format!("{}/page/summary/{}", self.wikipedia_base, topic.replace(' ', "_"));

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "analytics-chat-api/0.1")
            .send()
            .await
            .map_err(|e| anyhow!("Error fetching Wikipedia data: {}", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(format!(
                "Wikipedia article not found for '{}'. Please try a different search term.",
                topic
            ));
        }
        if !response.status().is_success() {
            return Err(anyhow!("Wikipedia returned status {}", response.status()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Could not parse Wikipedia response: {}", e))?;
        let extract = body
            .get("extract")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Wikipedia response had no summary"))?;

        let mut summary = extract.to_string();
        if summary.chars().count() > SUMMARY_MAX_CHARS {
            summary = summary.chars().take(SUMMARY_MAX_CHARS).collect::<String>() + "...";
        }
        Ok(summary)
    }
}

/// Translation prompt shared with the `/api/translate` endpoint
pub fn translation_prompt(text: &str) -> String {
    format!(
        "Translate the following text to English. If it's already in English, \
         return it as is. Only return the translation, no explanations:\n\n{}",
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::MockAi;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(text: &str) -> Query {
        Query {
            raw_text: text.to_string(),
            conversation_id: "c1".to_string(),
            user_id: "u1".to_string(),
        }
    }

    #[actix_web::test]
    async fn definition_produces_single_text_row() {
        let ai = MockAi::new()
            .classifying(r#"{"tool": "definition", "argument": "boleto"}"#)
            .generating(&["Boleto is a Brazilian payment method."]);

        let output = ToolHandler::new(ai).handle(&query("what is boleto?")).await;

        assert_eq!(output.results.len(), 1);
        assert_eq!(
            output.results[0]["text"].as_str().unwrap(),
            "Boleto is a Brazilian payment method."
        );
        assert!(output.error.is_none());
    }

    #[actix_web::test]
    async fn translation_uses_the_shared_prompt() {
        let ai = MockAi::new()
            .classifying(r#"{"tool": "translation", "argument": "frete gratis"}"#)
            .generating(&["free shipping"]);

        let output = ToolHandler::new(ai).handle(&query("translate 'frete gratis'")).await;

        assert_eq!(output.results[0]["text"].as_str().unwrap(), "free shipping");
        assert_eq!(output.message, "free shipping");
    }

    #[actix_web::test]
    async fn encyclopedia_lookup_truncates_long_summaries() {
        let server = MockServer::start().await;
        let long_extract = "x".repeat(800);
        Mock::given(method("GET"))
            .and(path("/page/summary/Sao_Paulo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "extract": long_extract
            })))
            .mount(&server)
            .await;

        let ai = MockAi::new()
            .classifying(r#"{"tool": "encyclopedia", "argument": "Sao Paulo"}"#);
        let handler = ToolHandler::new(ai).with_wikipedia_base(server.uri());

        let output = handler.handle(&query("tell me about Sao Paulo")).await;
        let text = output.results[0]["text"].as_str().unwrap();
        assert!(text.ends_with("..."));
        assert_eq!(text.chars().count(), SUMMARY_MAX_CHARS + 3);
    }

    #[actix_web::test]
    async fn missing_article_is_a_friendly_answer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page/summary/Nonexistent"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let ai = MockAi::new()
            .classifying(r#"{"tool": "encyclopedia", "argument": "Nonexistent"}"#);
        let handler = ToolHandler::new(ai).with_wikipedia_base(server.uri());

        let output = handler.handle(&query("what is Nonexistent?")).await;
        assert!(output.results[0]["text"].as_str().unwrap().contains("not found"));
        assert!(output.error.is_none());
    }

    #[actix_web::test]
    async fn unrecognized_tool_degrades() {
        let ai = MockAi::new().classifying(r#"{"tool": "weather"}"#);
        let output = ToolHandler::new(ai).handle(&query("weather in Sao Paulo")).await;

        assert!(output.results.is_empty());
        assert_eq!(output.error, Some(ErrorKind::ToolFailure));
    }
}
