use anyhow::{anyhow, Result};
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

/// Vector adapter backed by a Chroma server's HTTP API
#[derive(Clone, Debug)]
pub struct ChromaService {
    client: Client,
    base_url: String,
    collection: String,
}

impl ChromaService {
    pub fn new(base_url: &str, collection: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
        }
    }

    /// Query the collection for the k nearest neighbours. Chroma
    /// returns distances ascending; scores are `1 - distance` so the
    /// result is descending by similarity, ties broken by id.
    pub async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        let url = format!(
            "{}/api/v1/collections/{}/query",
            self.base_url, self.collection
        );
        let request_body = json!({
            "query_embeddings": [embedding],
            "n_results": k,
            "include": ["distances"],
        });

        debug!("Querying Chroma collection '{}' for {} neighbours", self.collection, k);

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to query vector store: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(anyhow!("Vector store error: Status {}, Details: {}", status, error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse vector store response: {}", e))?;

        let ids = body["ids"][0]
            .as_array()
            .ok_or_else(|| anyhow!("Vector store response is missing ids"))?;
        let distances = body["distances"][0]
            .as_array()
            .ok_or_else(|| anyhow!("Vector store response is missing distances"))?;

        let mut results: Vec<(String, f32)> = ids
            .iter()
            .zip(distances.iter())
            .filter_map(|(id, distance)| {
                let id = id.as_str()?.to_string();
                let score = 1.0 - distance.as_f64()? as f32;
                Some((id, score))
            })
            .collect();

        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(results)
    }
}
