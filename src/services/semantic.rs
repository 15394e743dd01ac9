use std::cmp::Ordering;

use log::{info, warn};
use serde_json::Value;

use crate::models::query::Query;
use crate::models::response::ErrorKind;
use crate::services::{
    AiServiceTrait, HandlerOutput, MemoryServiceTrait, SqlServiceTrait, VectorServiceTrait,
};

/// Handles semantic queries: embed the question, find the top-K
/// nearest products in the vector store, then load their full records
/// from the relational store.
#[derive(Clone, Debug)]
pub struct SemanticHandler<A, S, V, M>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
    S: SqlServiceTrait + Clone + std::fmt::Debug,
    V: VectorServiceTrait + Clone + std::fmt::Debug,
    M: MemoryServiceTrait + Clone + std::fmt::Debug,
{
    ai_service: A,
    sql_service: S,
    vector_service: V,
    memory_service: M,
    top_k: usize,
}

impl<A, S, V, M> SemanticHandler<A, S, V, M>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
    S: SqlServiceTrait + Clone + std::fmt::Debug,
    V: VectorServiceTrait + Clone + std::fmt::Debug,
    M: MemoryServiceTrait + Clone + std::fmt::Debug,
{
    pub fn new(
        ai_service: A,
        sql_service: S,
        vector_service: V,
        memory_service: M,
        top_k: usize,
    ) -> Self {
        Self {
            ai_service,
            sql_service,
            vector_service,
            memory_service,
            top_k,
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

        let embedding = match self.ai_service.embed(&text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                return HandlerOutput::failure(
                    ErrorKind::EmbeddingFailure,
                    format!("Could not embed the query for semantic search: {}", e),
                );
            }
        };

        let mut ranked = match self.vector_service.search(&embedding, self.top_k).await {
            Ok(matches) => matches,
            Err(e) => {
                return HandlerOutput::failure(
                    ErrorKind::ExecutionFailure,
                    format!("Semantic search failed: {}", e),
                );
            }
        };

        // Rank order is the ordering invariant: similarity descending,
        // ties broken by id ascending for determinism.
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        if ranked.is_empty() {
            return HandlerOutput::rows(Vec::new(), "No similar records were found.");
        }

        let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
        let fetched = match self.sql_service.fetch_by_ids(&ids).await {
            Ok(rows) => rows,
            Err(e) => {
                return HandlerOutput::failure(
                    ErrorKind::ExecutionFailure,
                    format!("Could not load records for the search results: {}", e),
                );
            }
        };

        // fetch_by_ids gives no ordering guarantee: reorder the rows
        // to similarity-rank order and attach the score.
        let results = reorder_by_rank(&ranked, fetched);

        info!("Semantic search returned {} of {} ranked candidates", results.len(), ranked.len());
        let message = if results.is_empty() {
            "No matching records were found for the search results.".to_string()
        } else {
            format!("Found {} semantically similar results.", results.len())
        };
        HandlerOutput::rows(results, message)
    }
}

/// Render an id column value the way the vector store keys it.
/// Adapters store ids as strings or integers; anything else has no
/// string form and cannot be matched.
fn render_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reorder fetched rows to match the similarity ranking and attach a
/// `similarity` column. A row is matched on the first id-like column
/// whose value appears in the ranking, so a row carrying several
/// `*_id` columns still lines up with the id the search returned.
/// Rows with no id in the ranking are dropped.
fn reorder_by_rank(
    ranked: &[(String, f32)],
    fetched: Vec<crate::models::response::ResultRow>,
) -> Vec<crate::models::response::ResultRow> {
    let wanted: std::collections::HashSet<&str> =
        ranked.iter().map(|(id, _)| id.as_str()).collect();
    let mut by_id: std::collections::HashMap<String, crate::models::response::ResultRow> = fetched
        .into_iter()
        .filter_map(|row| {
            let id = row.iter().find_map(|(key, value)| {
                if key == "id" || key.ends_with("_id") {
                    render_id(value).filter(|id| wanted.contains(id.as_str()))
                } else {
                    None
                }
            })?;
            Some((id, row))
        })
        .collect();

    ranked
        .iter()
        .filter_map(|(id, score)| {
            let mut row = by_id.remove(id)?;
            row.insert("similarity".to_string(), Value::from(*score as f64));
            Some(row)
        })
        .collect()
}
