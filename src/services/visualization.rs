use log::warn;
use serde_json::Value;

use crate::models::response::{ChartType, ResultRow, VisualizationConfig};
use crate::services::ai::strip_code_fences;
use crate::services::AiServiceTrait;

/// How many rows of sample data go into the selection prompt
const SAMPLE_ROWS: usize = 5;

/// Proposes a chart type and axis mapping for a result set.
///
/// The selector enforces its own post-condition: any axis column it
/// returns exists in row 0 of the results. When the provider names a
/// nonexistent column, an unknown chart type, or fails outright, the
/// always-renderable `table` fallback is used instead.
#[derive(Clone, Debug)]
pub struct VisualizationSelector<A>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
{
    ai_service: A,
}

impl<A> VisualizationSelector<A>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
{
    pub fn new(ai_service: A) -> Self {
        Self { ai_service }
    }

    /// Returns `None` only for empty result sets.
    pub async fn select(
        &self,
        results: &[ResultRow],
        original_query: &str,
    ) -> Option<VisualizationConfig> {
        let first_row = results.first()?;

        let prompt = build_selection_prompt(results, original_query);
        let response = match self.ai_service.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Visualization selection failed, falling back to table: {}", e);
                return Some(VisualizationConfig::table());
            }
        };

        match parse_selection(&response, first_row) {
            Some(config) => Some(config),
            None => {
                warn!("Visualization reply was unusable, falling back to table: {}", response);
                Some(VisualizationConfig::table())
            }
        }
    }
}

/// Parse the provider reply, validating every named column against
/// row 0. Returns `None` when the reply cannot be honored.
fn parse_selection(response: &str, first_row: &ResultRow) -> Option<VisualizationConfig> {
    let parsed: Value = serde_json::from_str(strip_code_fences(response)).ok()?;
    let chart_type = ChartType::from_label(parsed.get("type")?.as_str()?)?;

    let mut config = VisualizationConfig {
        chart_type,
        x_axis: None,
        y_axis: None,
        color: None,
    };
    for (field, slot) in [
        ("x_axis", &mut config.x_axis),
        ("y_axis", &mut config.y_axis),
        ("color", &mut config.color),
    ] {
        if let Some(column) = parsed.get(field).and_then(|v| v.as_str()) {
            if !first_row.contains_key(column) {
                return None;
            }
            *slot = Some(column.to_string());
        }
    }

    Some(config)
}

fn build_selection_prompt(results: &[ResultRow], original_query: &str) -> String {
    let columns: Vec<&String> = results
        .first()
        .map(|row| row.keys().collect())
        .unwrap_or_default();
    let sample: Vec<&ResultRow> = results.iter().take(SAMPLE_ROWS).collect();

    format!(
        r#"Pick the best way to visualize this query result.

USER QUERY: "{}"

COLUMNS: {:?}

SAMPLE ROWS (first {}):
{}

Chart types: "bar" (rankings, comparisons), "line" (trends over time), "table" (detail records), "map" (geographic data), "text" (single values).

Return ONLY a valid JSON object: {{"type": "...", "x_axis": "<column or omit>", "y_axis": "<column or omit>", "color": "<column or omit>"}}.
Only name columns that appear in COLUMNS."#,
        original_query,
        columns,
        SAMPLE_ROWS,
        serde_json::to_string_pretty(&sample).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{row, MockAi};
    use serde_json::json;

    fn sample_rows() -> Vec<ResultRow> {
        vec![
            row(&[("category", json!("toys")), ("revenue", json!(1200.0))]),
            row(&[("category", json!("books")), ("revenue", json!(800.0))]),
        ]
    }

    #[actix_web::test]
    async fn empty_results_skip_selection() {
        let selector = VisualizationSelector::new(MockAi::new());
        assert!(selector.select(&[], "top products").await.is_none());
    }

    #[actix_web::test]
    async fn valid_selection_is_honored() {
        let ai = MockAi::new()
            .generating(&[r#"{"type": "bar", "x_axis": "category", "y_axis": "revenue"}"#]);
        let config = VisualizationSelector::new(ai)
            .select(&sample_rows(), "revenue by category")
            .await
            .unwrap();

        assert_eq!(config.chart_type, ChartType::Bar);
        assert_eq!(config.x_axis.as_deref(), Some("category"));
        assert_eq!(config.y_axis.as_deref(), Some("revenue"));
    }

    #[actix_web::test]
    async fn nonexistent_column_falls_back_to_table() {
        let ai = MockAi::new()
            .generating(&[r#"{"type": "bar", "x_axis": "state", "y_axis": "revenue"}"#]);
        let config = VisualizationSelector::new(ai)
            .select(&sample_rows(), "revenue by state")
            .await
            .unwrap();

        assert_eq!(config, VisualizationConfig::table());
    }

    #[actix_web::test]
    async fn unknown_chart_type_falls_back_to_table() {
        let ai = MockAi::new().generating(&[r#"{"type": "pie", "x_axis": "category"}"#]);
        let config = VisualizationSelector::new(ai)
            .select(&sample_rows(), "share by category")
            .await
            .unwrap();

        assert_eq!(config, VisualizationConfig::table());
    }

    #[actix_web::test]
    async fn provider_failure_falls_back_to_table() {
        let config = VisualizationSelector::new(MockAi::new())
            .select(&sample_rows(), "revenue by category")
            .await
            .unwrap();

        assert_eq!(config, VisualizationConfig::table());
    }

    #[actix_web::test]
    async fn axisless_reply_is_valid() {
        let ai = MockAi::new().generating(&[r#"{"type": "table"}"#]);
        let config = VisualizationSelector::new(ai)
            .select(&sample_rows(), "show everything")
            .await
            .unwrap();

        assert_eq!(config.chart_type, ChartType::Table);
        assert!(config.x_axis.is_none());
    }
}
