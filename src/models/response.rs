use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::query::Intent;

/// One result row: an ordered mapping from column name to a JSON scalar.
///
/// Columns vary per query, so rows are open maps rather than a fixed
/// struct. `serde_json` is built with `preserve_order` so column order
/// survives the round trip to the client.
pub type ResultRow = serde_json::Map<String, Value>;

/// Chart type recommended for a result set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChartType {
    #[serde(rename = "bar")]
    Bar,
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "map")]
    Map,
    #[serde(rename = "text")]
    Text,
}

impl ChartType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "bar" => Some(ChartType::Bar),
            "line" => Some(ChartType::Line),
            "table" => Some(ChartType::Table),
            "map" => Some(ChartType::Map),
            "text" => Some(ChartType::Text),
            _ => None,
        }
    }
}

/// Chart-type and axis-mapping recommendation for a result set.
///
/// Axis columns, when present, have been validated against row 0 of the
/// associated results; the `table` fallback guarantees this.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualizationConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl VisualizationConfig {
    /// The always-renderable fallback: a plain table with no axis mapping.
    pub fn table() -> Self {
        Self {
            chart_type: ChartType::Table,
            x_axis: None,
            y_axis: None,
            color: None,
        }
    }
}

/// Kinds of failure the pipeline can surface.
///
/// None of these abort the request: each query always yields a
/// `ResponseState`, degraded if necessary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    ClassificationFailure,
    GenerationFailure,
    UnsafeStatementRejected,
    ExecutionFailure,
    EmbeddingFailure,
    ToolFailure,
    MemoryFailure,
    Timeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::ClassificationFailure => "ClassificationFailure",
            ErrorKind::GenerationFailure => "GenerationFailure",
            ErrorKind::UnsafeStatementRejected => "UnsafeStatementRejected",
            ErrorKind::ExecutionFailure => "ExecutionFailure",
            ErrorKind::EmbeddingFailure => "EmbeddingFailure",
            ErrorKind::ToolFailure => "ToolFailure",
            ErrorKind::MemoryFailure => "MemoryFailure",
            ErrorKind::Timeout => "Timeout",
        };
        f.write_str(s)
    }
}

/// The unit returned per query: rows, visualization recommendation,
/// insights and a status message, assembled once and then immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseState {
    pub query: String,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    pub results: Vec<ResultRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_config: Option<VisualizationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

/// Request body for the translation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
}

/// Response body for the translation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated: String,
}

/// Error payload for non-2xx responses: `{"detail": {...}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Client error: `{"detail": {"message": ...}}`
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            detail: ErrorDetail {
                message: Some(message.into()),
                error: None,
            },
        }
    }

    /// Server error: `{"detail": {"error": ...}}`
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            detail: ErrorDetail {
                message: None,
                error: Some(error.into()),
            },
        }
    }
}
