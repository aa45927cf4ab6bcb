//! Data types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Human-readable label used by the plain-text and markdown exports.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(format!("invalid role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// Chat session. Aggregate fields (`total_messages`, `last_message_preview`)
/// are denormalized and maintained by the message write path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub session_id: String,
    pub user_id: String,
    pub title: String,
    pub is_active: bool,
    pub total_messages: i64,
    pub total_tokens_used: i64,
    pub last_message_preview: Option<String>,
    // Timestamps (Unix milliseconds)
    pub created_at: i64,
    pub updated_at: i64,
}

/// Chat message. Immutable after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub uuid: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub tokens_used: i64,
    pub is_error: bool,
    pub is_fallback: bool,
    pub response_time_ms: Option<i64>,
    pub metadata: Option<String>, // free-form metadata (JSON)
    pub created_at: i64,
}

/// Message input (write path). Id and creation timestamp are assigned by the
/// store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub tokens_used: i64,
    pub is_error: bool,
    pub is_fallback: bool,
    pub response_time_ms: Option<i64>,
    pub metadata: Option<String>,
}

impl NewMessage {
    /// Plain message with defaulted flags and counters.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tokens_used: 0,
            is_error: false,
            is_fallback: false,
            response_time_ms: None,
            metadata: None,
        }
    }
}

/// Per-user point-in-time statistics. All date-bounded counts share one
/// "now" snapshot per computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStats {
    pub total_sessions: i64,
    pub total_messages: i64,
    pub total_tokens: i64,
    /// Rounded to one decimal place.
    pub avg_messages_per_session: f64,
    /// ISO date (YYYY-MM-DD) with the most session creations, `None` when the
    /// user has no active sessions.
    pub most_active_day: Option<String>,
    pub sessions_this_week: i64,
    pub sessions_this_month: i64,
}

/// Daily usage rollup (one row per user per calendar date). Read-only here;
/// an external aggregation job keeps it populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAnalytics {
    pub user_id: String,
    pub date: String,
    pub total_sessions: i64,
    pub total_messages: i64,
    pub total_tokens: i64,
    pub total_response_time_ms: i64,
    pub user_messages: i64,
    pub assistant_messages: i64,
    pub error_messages: i64,
    pub fallback_messages: i64,
}

/// Structured session dump (the `json` export format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub session: Session,
    pub messages: Vec<Message>,
}

/// Truncate to at most `max` characters, appending an ellipsis when the
/// input was longer. Character-based so multi-byte content stays intact.
pub(crate) fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::User, Role::Assistant, Role::System] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("tool".parse::<Role>().is_err());
    }

    #[test]
    fn test_truncate_short_input_unchanged() {
        assert_eq!(truncate_with_ellipsis("hello", 100), "hello");
        let exact = "x".repeat(100);
        assert_eq!(truncate_with_ellipsis(&exact, 100), exact);
    }

    #[test]
    fn test_truncate_long_input_gets_ellipsis() {
        let long = "x".repeat(101);
        let out = truncate_with_ellipsis(&long, 100);
        assert_eq!(out.len(), 103);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let cyrillic = "д".repeat(60);
        assert_eq!(truncate_with_ellipsis(&cyrillic, 100), cyrillic);

        let out = truncate_with_ellipsis(&"д".repeat(120), 100);
        assert_eq!(out.chars().count(), 103);
    }
}
