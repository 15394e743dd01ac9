use log::{info, warn};

use crate::models::query::Query;
use crate::models::response::ErrorKind;
use crate::services::ai::strip_code_fences;
use crate::services::{AiServiceTrait, HandlerOutput, MemoryServiceTrait, SqlServiceTrait};

/// Mutation verbs that must never reach the database. The scan is
/// word-boundary based so column names like `updated_at` pass.
const MUTATION_KEYWORDS: &[&str] = &["INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE"];

/// Handles analytical queries: generate SQL from the question and the
/// live schema, vet it, execute it, return rows.
#[derive(Clone, Debug)]
pub struct AnalyticalHandler<A, S, M>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
    S: SqlServiceTrait + Clone + std::fmt::Debug,
    M: MemoryServiceTrait + Clone + std::fmt::Debug,
{
    ai_service: A,
    sql_service: S,
    memory_service: M,
}

impl<A, S, M> AnalyticalHandler<A, S, M>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
    S: SqlServiceTrait + Clone + std::fmt::Debug,
    M: MemoryServiceTrait + Clone + std::fmt::Debug,
{
    pub fn new(ai_service: A, sql_service: S, memory_service: M) -> Self {
        Self {
            ai_service,
            sql_service,
            memory_service,
        }
    }

    pub async fn handle(&self, query: &Query) -> HandlerOutput {
        // Memory enhancement fails open: proceed with the raw text.
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

        let schema = match self.sql_service.fetch_schema().await {
            Ok(schema) => schema,
            Err(e) => {
                return HandlerOutput::failure(
                    ErrorKind::ExecutionFailure,
                    format!("Could not read the database schema: {}", e),
                );
            }
        };

        let generated = match self.ai_service.generate(&build_sql_prompt(&schema, &text)).await {
            Ok(text) => text,
            Err(e) => {
                return HandlerOutput::failure(
                    ErrorKind::GenerationFailure,
                    format!("Could not generate a SQL query: {}", e),
                );
            }
        };
        let sql = strip_code_fences(&generated).trim().to_string();
        info!("Generated SQL: {}", sql);

        if let Some(keyword) = find_mutation_keyword(&sql) {
            warn!("Rejected generated SQL containing '{}': {}", keyword, sql);
            return HandlerOutput {
                results: Vec::new(),
                sql_query: Some(sql),
                message: format!(
                    "The generated SQL statement was rejected: it contains the mutation keyword '{}'. Only read-only queries are executed.",
                    keyword
                ),
                error: Some(ErrorKind::UnsafeStatementRejected),
            };
        }

        match self.sql_service.execute(&sql).await {
            Ok(results) => {
                let message = if results.is_empty() {
                    "The query ran successfully but returned no rows.".to_string()
                } else {
                    format!("Found {} matching rows.", results.len())
                };
                HandlerOutput {
                    results,
                    sql_query: Some(sql),
                    message,
                    error: None,
                }
            }
            Err(e) => HandlerOutput {
                results: Vec::new(),
                sql_query: Some(sql),
                message: format!("The query could not be executed: {}", e),
                error: Some(ErrorKind::ExecutionFailure),
            },
        }
    }
}

fn build_sql_prompt(schema: &str, question: &str) -> String {
    format!(
        r#"Given this PostgreSQL schema:

{}

Write a single, valid PostgreSQL query to answer this user question: {}

When joining products, also join product_category_translation on product_category_name to get English names.

When calculating price or revenue, use the price column from order_items.

Return ONLY the SQL string."#,
        schema, question
    )
}

/// Scan for mutation verbs on word boundaries, case-insensitively.
fn find_mutation_keyword(sql: &str) -> Option<&'static str> {
    let upper = sql.to_uppercase();
    let words: Vec<&str> = upper
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .collect();
    MUTATION_KEYWORDS
        .iter()
        .find(|keyword| words.iter().any(|w| w == *keyword))
        .copied()
}
