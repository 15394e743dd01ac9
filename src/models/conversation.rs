use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

/// One turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Upper bound on turns retained per conversation. The history is
/// append-only; once the cap is reached the oldest turns are dropped.
pub const MAX_TURNS_PER_CONVERSATION: usize = 50;

/// How many recent turns are folded into an enhanced query
pub const CONTEXT_TURNS: usize = 5;

/// Render the most recent turns as plain-text context for a prompt.
pub fn render_recent_turns(history: &[ConversationTurn]) -> String {
    let start = history.len().saturating_sub(CONTEXT_TURNS);
    history[start..]
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            format!("{}: {}", role, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_only_recent_turns() {
        let history: Vec<ConversationTurn> = (0..8)
            .map(|i| ConversationTurn::user(format!("message {}", i)))
            .collect();

        let rendered = render_recent_turns(&history);
        assert!(!rendered.contains("message 2"));
        assert!(rendered.contains("message 3"));
        assert!(rendered.contains("message 7"));
    }

    #[test]
    fn renders_roles() {
        let history = vec![
            ConversationTurn::user("hello"),
            ConversationTurn::assistant("hi there"),
        ];
        let rendered = render_recent_turns(&history);
        assert_eq!(rendered, "user: hello\nassistant: hi there");
    }
}
