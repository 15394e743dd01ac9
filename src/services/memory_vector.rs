use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

/// In-memory vector store: brute-force cosine similarity over the
/// stored embeddings. Used for local development and tests.
#[derive(Clone, Debug)]
pub struct MemoryVectorService {
    vectors: Arc<Mutex<HashMap<String, Vec<f32>>>>,
}

impl MemoryVectorService {
    pub fn new() -> Self {
        Self {
            vectors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn insert(&self, id: &str, embedding: Vec<f32>) -> Result<()> {
        let mut vectors = self.vectors.lock().map_err(|_| anyhow!("Failed to lock vectors"))?;
        vectors.insert(id.to_string(), embedding);
        Ok(())
    }

    /// Top-k nearest neighbours by cosine similarity, scores
    /// descending, ties broken by id ascending.
    pub async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        let vectors = self.vectors.lock().map_err(|_| anyhow!("Failed to lock vectors"))?;

        let mut scored: Vec<(String, f32)> = vectors
            .iter()
            .map(|(id, v)| (id.clone(), cosine_similarity(embedding, v)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn ranks_by_similarity() {
        let service = MemoryVectorService::new();
        service.insert("far", vec![0.0, 1.0]).unwrap();
        service.insert("near", vec![1.0, 0.1]).unwrap();
        service.insert("exact", vec![1.0, 0.0]).unwrap();

        let results = service.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "exact");
        assert_eq!(results[1].0, "near");
    }

    #[actix_web::test]
    async fn breaks_score_ties_by_id() {
        let service = MemoryVectorService::new();
        service.insert("b", vec![1.0, 0.0]).unwrap();
        service.insert("a", vec![2.0, 0.0]).unwrap();

        // Cosine similarity ignores magnitude, so both score 1.0.
        let results = service.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].0, "b");
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
