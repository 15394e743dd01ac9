use anyhow::{anyhow, Result};
use log::warn;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};

use crate::models::response::ResultRow;

/// Relational adapter backed by Postgres. All access is read-only;
/// the analytical handler rejects mutating statements before they
/// ever reach this service.
#[derive(Clone, Debug)]
pub struct PostgresService {
    pool: PgPool,
}

impl PostgresService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Execute a SQL statement and return rows as ordered column maps
    pub async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    /// Dump table/column/type information for the `public` schema as a
    /// prompt-ready string.
    pub async fn fetch_schema(&self) -> Result<String> {
        let rows = sqlx::query(
            "SELECT table_name, column_name, data_type, is_nullable \
             FROM information_schema.columns \
             WHERE table_schema = 'public' \
             ORDER BY table_name, ordinal_position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut schema = String::from("Database Schema:\n");
        let mut current_table = String::new();
        for row in &rows {
            let table: String = row.try_get("table_name")?;
            let column: String = row.try_get("column_name")?;
            let data_type: String = row.try_get("data_type")?;
            let nullable: String = row.try_get("is_nullable")?;

            if table != current_table {
                schema.push_str(&format!("\nTable: {}\n", table));
                schema.push_str(&format!("{}\n", "-".repeat(table.len() + 7)));
                current_table = table;
            }
            let null_str = if nullable == "YES" { "NULL" } else { "NOT NULL" };
            schema.push_str(&format!("  - {}: {} {}\n", column, data_type, null_str));
        }

        Ok(schema)
    }

    /// Fetch full product records for the given ids
    pub async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ResultRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT * FROM products WHERE product_id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_map).collect())
    }
}

/// Decode a Postgres row into an ordered column map of JSON scalars.
/// Types without a scalar mapping come back as null.
fn row_to_map(row: &PgRow) -> ResultRow {
    let mut map = ResultRow::new();
    for column in row.columns() {
        let name = column.name();
        let value = match column.type_info().name() {
            "INT2" => row
                .try_get::<Option<i16>, _>(name)
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "INT4" => row
                .try_get::<Option<i32>, _>(name)
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "INT8" => row
                .try_get::<Option<i64>, _>(name)
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(name)
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(name)
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "NUMERIC" => row
                .try_get::<Option<sqlx::types::BigDecimal>, _>(name)
                .ok()
                .flatten()
                .and_then(|d| d.to_string().parse::<f64>().ok())
                .map(Value::from)
                .unwrap_or(Value::Null),
            "BOOL" => row
                .try_get::<Option<bool>, _>(name)
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "TIMESTAMP" => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(name)
                .ok()
                .flatten()
                .map(|t| Value::from(t.to_string()))
                .unwrap_or(Value::Null),
            "TIMESTAMPTZ" => row
                .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name)
                .ok()
                .flatten()
                .map(|t| Value::from(t.to_rfc3339()))
                .unwrap_or(Value::Null),
            "DATE" => row
                .try_get::<Option<chrono::NaiveDate>, _>(name)
                .ok()
                .flatten()
                .map(|d| Value::from(d.to_string()))
                .unwrap_or(Value::Null),
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
                .try_get::<Option<String>, _>(name)
                .ok()
                .flatten()
                .map(Value::from)
                .unwrap_or(Value::Null),
            "UUID" => row
                .try_get::<Option<uuid::Uuid>, _>(name)
                .ok()
                .flatten()
                .map(|u| Value::from(u.to_string()))
                .unwrap_or(Value::Null),
            other => {
                warn!("Unmapped Postgres type '{}' for column '{}', returning null", other, name);
                Value::Null
            }
        };
        map.insert(name.to_string(), value);
    }
    map
}

/// Open a connection pool against the configured database
pub async fn connect(database_url: &str) -> Result<PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .min_connections(1)
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| anyhow!("Failed to connect to Postgres: {}", e))
}
