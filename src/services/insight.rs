use log::warn;

use crate::models::response::ResultRow;
use crate::services::ai::strip_code_fences;
use crate::services::AiServiceTrait;

/// How many rows of data the insight prompt may include
const SAMPLE_ROWS: usize = 10;

/// Produces a short narrative analysis of a result set as
/// `**Title:** description` bullet lines.
#[derive(Clone, Debug)]
pub struct InsightGenerator<A>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
{
    ai_service: A,
}

impl<A> InsightGenerator<A>
where
    A: AiServiceTrait + Clone + std::fmt::Debug,
{
    pub fn new(ai_service: A) -> Self {
        Self { ai_service }
    }

    /// Returns `None` for empty result sets and on provider failure;
    /// insights are optional and never block the response.
    pub async fn generate(&self, results: &[ResultRow], original_query: &str) -> Option<String> {
        if results.is_empty() {
            return None;
        }

        let sample: Vec<&ResultRow> = results.iter().take(SAMPLE_ROWS).collect();
        let prompt = format!(
            r#"Analyze this query result and produce 3-5 short findings.

USER QUERY: "{}"

DATA ({} rows total, first {} shown):
{}

Write each finding on its own line as:
**Title:** one-sentence description

No introduction, no closing remarks, no markdown beyond the bold titles."#,
            original_query,
            results.len(),
            sample.len(),
            serde_json::to_string_pretty(&sample).unwrap_or_default()
        );

        match self.ai_service.generate(&prompt).await {
            Ok(text) => {
                let cleaned = sanitize_insights(&text);
                if cleaned.is_empty() {
                    None
                } else {
                    Some(cleaned)
                }
            }
            Err(e) => {
                warn!("Insight generation failed, continuing without insights: {}", e);
                None
            }
        }
    }
}

/// Strip decorative artifacts the model sometimes adds: code fences
/// and bullet prefixes. The contract is plain enumerable findings.
fn sanitize_insights(text: &str) -> String {
    strip_code_fences(text)
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['•', '-'])
                .trim_start_matches("* ")
                .trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
