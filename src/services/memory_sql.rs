use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::models::response::ResultRow;

const DEFAULT_SCHEMA: &str = "Database Schema:

Table: products
---------------
  - product_id: character varying NOT NULL
  - product_category_name: character varying NULL
  - price: numeric NULL

Table: orders
-------------
  - order_id: character varying NOT NULL
  - order_status: character varying NULL
  - order_purchase_timestamp: timestamp NULL
";

/// In-memory stand-in for the relational adapter, used for local
/// development and tests. Queries are answered from registered
/// fixtures; unregistered statements return empty result sets.
#[derive(Clone, Debug)]
pub struct MemorySqlService {
    records: Arc<Mutex<HashMap<String, ResultRow>>>,
    results: Arc<Mutex<HashMap<String, Vec<ResultRow>>>>,
    schema: String,
}

impl MemorySqlService {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            results: Arc::new(Mutex::new(HashMap::new())),
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    /// Register the rows a given SQL statement should return
    pub fn register_query(&self, sql: &str, rows: Vec<ResultRow>) -> Result<()> {
        let mut results = self.results.lock().map_err(|_| anyhow!("Failed to lock results"))?;
        results.insert(sql.trim().to_string(), rows);
        Ok(())
    }

    /// Insert an id-keyed record served by `fetch_by_ids`
    pub fn insert_record(&self, id: &str, row: ResultRow) -> Result<()> {
        let mut records = self.records.lock().map_err(|_| anyhow!("Failed to lock records"))?;
        records.insert(id.to_string(), row);
        Ok(())
    }

    /// Execute a read-only statement against the registered fixtures
    pub async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>> {
        let results = self.results.lock().map_err(|_| anyhow!("Failed to lock results"))?;
        Ok(results.get(sql.trim()).cloned().unwrap_or_default())
    }

    pub async fn fetch_schema(&self) -> Result<String> {
        Ok(self.schema.clone())
    }

    /// Fetch full records for the given ids, in the order requested.
    /// Ids without a record are skipped.
    pub async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ResultRow>> {
        let records = self.records.lock().map_err(|_| anyhow!("Failed to lock records"))?;
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, serde_json::Value)]) -> ResultRow {
        let mut row = ResultRow::new();
        for (k, v) in pairs {
            row.insert(k.to_string(), v.clone());
        }
        row
    }

    #[actix_web::test]
    async fn unregistered_query_returns_empty() {
        let service = MemorySqlService::new();
        let rows = service.execute("SELECT 1").await.unwrap();
        assert!(rows.is_empty());
    }

    #[actix_web::test]
    async fn registered_query_returns_fixture_rows() {
        let service = MemorySqlService::new();
        service
            .register_query("SELECT * FROM products", vec![row(&[("product_id", json!("p1"))])])
            .unwrap();

        let rows = service.execute("  SELECT * FROM products  ").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["product_id"], json!("p1"));
    }

    #[actix_web::test]
    async fn fetch_by_ids_preserves_requested_order() {
        let service = MemorySqlService::new();
        service.insert_record("p1", row(&[("product_id", json!("p1"))])).unwrap();
        service.insert_record("p2", row(&[("product_id", json!("p2"))])).unwrap();

        let rows = service
            .fetch_by_ids(&["p2".to_string(), "missing".to_string(), "p1".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["product_id"], json!("p2"));
        assert_eq!(rows[1]["product_id"], json!("p1"));
    }
}
