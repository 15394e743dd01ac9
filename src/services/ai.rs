use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{debug, error, info};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::Config;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const GEMINI_MODEL: &str = "gemini-2.5-flash";
const EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Capability provider backed by hosted AI services: Gemini for
/// classification and generation, OpenAI for embeddings.
///
/// The embedding capability is optional; when no OpenAI key is
/// configured `embed` fails and the semantic handler degrades.
#[derive(Clone, Debug)]
pub struct AiService {
    client: Client,
    gemini_api_key: String,
    openai_api_key: Option<String>,
    gemini_base: String,
    openai_base: String,
}

impl AiService {
    /// Create a new AiService using Config
    pub fn new(config: &Config) -> Self {
        if config.openai_api_key.is_none() {
            info!("OPENAI_API_KEY not set, embeddings unavailable (semantic queries will degrade)");
        }

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            gemini_api_key: config.gemini_api_key.clone(),
            openai_api_key: config.openai_api_key.clone(),
            gemini_base: GEMINI_API_BASE.to_string(),
            openai_base: OPENAI_API_BASE.to_string(),
        }
    }

    /// Override API base URLs, used by tests to point at a mock server.
    #[allow(dead_code)]
    pub fn with_base_urls(mut self, gemini_base: String, openai_base: String) -> Self {
        self.gemini_base = gemini_base;
        self.openai_base = openai_base;
        self
    }

    /// Classification call: same endpoint as `generate` but pinned to
    /// temperature 0 so labels stay stable.
    pub async fn classify(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt, Some(0.0)).await
    }

    /// Free-form text/SQL generation
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt, None).await
    }

    async fn generate_content(&self, prompt: &str, temperature: Option<f32>) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.gemini_base, GEMINI_MODEL, self.gemini_api_key
        );

        let mut request_body = json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        });
        if let Some(temp) = temperature {
            request_body["generationConfig"] = json!({ "temperature": temp });
        }

        debug!("Sending request to Gemini API with model: {}", GEMINI_MODEL);

        let response = match self.client.post(&url).json(&request_body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!("Failed to send request to Gemini API: {}", e);
                if e.is_timeout() {
                    return Err(anyhow!("Gemini API request timed out"));
                }
                return Err(anyhow!("Failed to send request to Gemini API: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            error!("Gemini API error: Status {}, Details: {}", status, error_text);
            return Err(anyhow!("Gemini API error: Status {}", status));
        }

        let response_json: Value = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to parse Gemini API response as JSON: {}", e);
                return Err(anyhow!("Failed to parse Gemini API response: {}", e));
            }
        };

        match response_json["candidates"][0]["content"]["parts"][0]["text"].as_str() {
            Some(text) => Ok(text.trim().to_string()),
            None => {
                error!("Could not extract text from Gemini response: {}", response_json);
                Err(anyhow!("Could not extract text from Gemini response"))
            }
        }
    }

    /// Embed a single text via the OpenAI embeddings API
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = match &self.openai_api_key {
            Some(key) => key,
            None => return Err(anyhow!("OPENAI_API_KEY is not configured")),
        };

        let url = format!("{}/embeddings", self.openai_base);
        let request_body = json!({
            "model": EMBEDDING_MODEL,
            "input": text,
        });

        debug!("Sending request to OpenAI embeddings API with model: {}", EMBEDDING_MODEL);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send request to OpenAI API: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            error!("OpenAI API error: Status {}, Details: {}", status, error_text);
            return Err(anyhow!("OpenAI API error: Status {}", status));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse OpenAI API response: {}", e))?;

        let embedding = response_json["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| anyhow!("Could not extract embedding from OpenAI response"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        Ok(embedding)
    }
}

/// Strip markdown code fences the models wrap around JSON and SQL.
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    for prefix in ["```json", "```sql", "```"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest;
            break;
        }
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> Config {
        Config {
            server_port: 0,
            gemini_api_key: "test-key".to_string(),
            openai_api_key: Some("test-key".to_string()),
            query_timeout_secs: 120,
            semantic_top_k: 10,
            database_url: String::new(),
            redis_url: String::new(),
            chroma_url: String::new(),
            chroma_collection: String::new(),
        }
    }

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```\nplain\n```"), "plain");
        assert_eq!(strip_code_fences("no fences"), "no fences");
    }

    #[actix_web::test]
    async fn generate_extracts_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [
                    { "content": { "parts": [ { "text": "SELECT * FROM orders" } ] } }
                ]
            })))
            .mount(&server)
            .await;

        let service = AiService::new(&test_config())
            .with_base_urls(server.uri(), server.uri());
        let text = service.generate("write sql").await.unwrap();
        assert_eq!(text, "SELECT * FROM orders");
    }

    #[actix_web::test]
    async fn embed_extracts_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [ { "embedding": [0.1, 0.2, 0.3] } ]
            })))
            .mount(&server)
            .await;

        let service = AiService::new(&test_config())
            .with_base_urls(server.uri(), server.uri());
        let embedding = service.embed("good products").await.unwrap();
        assert_eq!(embedding.len(), 3);
    }

    #[actix_web::test]
    async fn embed_fails_without_key() {
        let mut config = test_config();
        config.openai_api_key = None;
        let service = AiService::new(&config);
        assert!(service.embed("anything").await.is_err());
    }

    #[actix_web::test]
    async fn generate_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let service = AiService::new(&test_config())
            .with_base_urls(server.uri(), server.uri());
        assert!(service.generate("anything").await.is_err());
    }
}
