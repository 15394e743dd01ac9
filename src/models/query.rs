use serde::{Deserialize, Serialize};

/// Request body for the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: String,
    pub user_id: String,
}

/// A validated user query, immutable once received.
///
/// `raw_text` is guaranteed non-empty: the HTTP layer rejects blank
/// messages before a `Query` is ever constructed.
#[derive(Debug, Clone)]
pub struct Query {
    pub raw_text: String,
    pub conversation_id: String,
    pub user_id: String,
}

/// The classified purpose of a query, assigned once by the router
/// and never changed downstream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Intent {
    #[serde(rename = "analytical")]
    Analytical,
    #[serde(rename = "semantic")]
    Semantic,
    #[serde(rename = "tool")]
    Tool,
    #[serde(rename = "conversational")]
    Conversational,
}

impl Intent {
    /// Parse a label produced by the classification model.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "analytical" => Some(Intent::Analytical),
            "semantic" => Some(Intent::Semantic),
            "tool" => Some(Intent::Tool),
            "conversational" => Some(Intent::Conversational),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Analytical => "analytical",
            Intent::Semantic => "semantic",
            Intent::Tool => "tool",
            Intent::Conversational => "conversational",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_labels_case_insensitively() {
        assert_eq!(Intent::from_label("Analytical"), Some(Intent::Analytical));
        assert_eq!(Intent::from_label(" semantic "), Some(Intent::Semantic));
        assert_eq!(Intent::from_label("TOOL"), Some(Intent::Tool));
        assert_eq!(Intent::from_label("conversational"), Some(Intent::Conversational));
    }

    #[test]
    fn rejects_unknown_labels() {
        assert_eq!(Intent::from_label("sql"), None);
        assert_eq!(Intent::from_label(""), None);
    }
}
