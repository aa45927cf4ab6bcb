//! Session search.

use crate::db::ChatDb;
use crate::error::{Error, Result};
use crate::types::Session;
use rusqlite::params;

/// Hard cap on search results.
pub const SEARCH_RESULT_LIMIT: usize = 20;

/// Escape `LIKE` pattern metacharacters so user input matches literally.
///
/// `%` and `_` are wildcards; the backslash is the escape character the
/// queries declare via `ESCAPE '\'`.
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

impl ChatDb {
    /// Free-text search over the user's active sessions.
    ///
    /// Matches against the session title, the last-message preview, or the
    /// content of any message in the session (SQLite `LIKE`, so ASCII
    /// case-insensitive). A session matching on several messages appears
    /// once. Results are ordered most-recently-updated first and capped at
    /// [`SEARCH_RESULT_LIMIT`] regardless of `limit`.
    ///
    /// The query must be non-empty after trimming.
    pub fn search_sessions(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<Session>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("search query is required".into()));
        }

        let limit = if limit == 0 {
            SEARCH_RESULT_LIMIT
        } else {
            limit.min(SEARCH_RESULT_LIMIT)
        };
        let pattern = format!("%{}%", escape_like(trimmed));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT s.id, s.session_id, s.user_id, s.title, s.is_active,
                   s.total_messages, s.total_tokens_used, s.last_message_preview,
                   s.created_at, s.updated_at
            FROM sessions s
            LEFT JOIN messages m ON m.session_id = s.session_id
            WHERE s.user_id = ?1 AND s.is_active = 1
              AND (s.title LIKE ?2 ESCAPE '\'
                   OR s.last_message_preview LIKE ?2 ESCAPE '\'
                   OR m.content LIKE ?2 ESCAPE '\')
            ORDER BY s.updated_at DESC
            LIMIT ?3
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, pattern, limit as i64], |row| {
            let is_active: i64 = row.get(4)?;
            Ok(Session {
                id: row.get(0)?,
                session_id: row.get(1)?,
                user_id: row.get(2)?,
                title: row.get(3)?,
                is_active: is_active != 0,
                total_messages: row.get(5)?,
                total_tokens_used: row.get(6)?,
                last_message_preview: row.get(7)?,
                created_at: row.get(8)?,
                updated_at: row.get(9)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_plain_text() {
        assert_eq!(escape_like("headache"), "headache");
        assert_eq!(escape_like("two words"), "two words");
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }

    #[test]
    fn test_escape_like_backslash() {
        assert_eq!(escape_like("C:\\temp"), "C:\\\\temp");
    }
}
