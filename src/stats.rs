//! Per-user statistics aggregation.

use crate::db::{current_time_ms, ChatDb};
use crate::error::Result;
use crate::types::{ChatStats, DailyAnalytics};
use rusqlite::{params, OptionalExtension};

const WEEK_MS: i64 = 7 * 86_400_000;
const MONTH_MS: i64 = 30 * 86_400_000;

/// Round to one decimal place.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

impl ChatDb {
    /// Compute point-in-time usage statistics for a user.
    ///
    /// Read-only fan-out over sessions and messages. All date-bounded counts
    /// use a single "now" snapshot taken at the start of the call, so the
    /// sub-queries cannot skew against each other. Any query failure aborts
    /// the whole computation; partial stats are never returned.
    pub fn compute_stats(&self, user_id: &str) -> Result<ChatStats> {
        let conn = self.conn.lock();

        let now = current_time_ms();
        let week_ago = now - WEEK_MS;
        let month_ago = now - MONTH_MS;

        let total_sessions: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ?1 AND is_active = 1",
            params![user_id],
            |row| row.get(0),
        )?;

        let total_messages: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages m \
             JOIN sessions s ON m.session_id = s.session_id \
             WHERE s.user_id = ?1 AND s.is_active = 1",
            params![user_id],
            |row| row.get(0),
        )?;

        let total_tokens: i64 = conn.query_row(
            "SELECT COALESCE(SUM(m.tokens_used), 0) FROM messages m \
             JOIN sessions s ON m.session_id = s.session_id \
             WHERE s.user_id = ?1 AND s.is_active = 1",
            params![user_id],
            |row| row.get(0),
        )?;

        let avg_messages: Option<f64> = conn.query_row(
            "SELECT AVG(total_messages) FROM sessions \
             WHERE user_id = ?1 AND is_active = 1",
            params![user_id],
            |row| row.get(0),
        )?;

        // Calendar date with the most session creations
        let most_active_day: Option<String> = conn
            .query_row(
                "SELECT date(created_at / 1000, 'unixepoch') AS day \
                 FROM sessions \
                 WHERE user_id = ?1 AND is_active = 1 \
                 GROUP BY day \
                 ORDER BY COUNT(*) DESC \
                 LIMIT 1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        let sessions_this_week: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions \
             WHERE user_id = ?1 AND is_active = 1 AND created_at >= ?2",
            params![user_id, week_ago],
            |row| row.get(0),
        )?;

        let sessions_this_month: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions \
             WHERE user_id = ?1 AND is_active = 1 AND created_at >= ?2",
            params![user_id, month_ago],
            |row| row.get(0),
        )?;

        Ok(ChatStats {
            total_sessions,
            total_messages,
            total_tokens,
            avg_messages_per_session: round1(avg_messages.unwrap_or(0.0)),
            most_active_day,
            sessions_this_week,
            sessions_this_month,
        })
    }

    // ==================== Daily analytics (read-only) ====================

    /// Rollup row for one calendar date, if the external aggregation job has
    /// produced it.
    pub fn get_daily_analytics(&self, user_id: &str, date: &str) -> Result<Option<DailyAnalytics>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT user_id, date, total_sessions, total_messages, total_tokens, \
                    total_response_time_ms, user_messages, assistant_messages, \
                    error_messages, fallback_messages \
             FROM daily_analytics \
             WHERE user_id = ?1 AND date = ?2",
            params![user_id, date],
            map_daily_analytics,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Recent rollup rows, newest date first.
    pub fn list_daily_analytics(&self, user_id: &str, limit: usize) -> Result<Vec<DailyAnalytics>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT user_id, date, total_sessions, total_messages, total_tokens, \
                    total_response_time_ms, user_messages, assistant_messages, \
                    error_messages, fallback_messages \
             FROM daily_analytics \
             WHERE user_id = ?1 \
             ORDER BY date DESC \
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], map_daily_analytics)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

fn map_daily_analytics(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyAnalytics> {
    Ok(DailyAnalytics {
        user_id: row.get(0)?,
        date: row.get(1)?,
        total_sessions: row.get(2)?,
        total_messages: row.get(3)?,
        total_tokens: row.get(4)?,
        total_response_time_ms: row.get(5)?,
        user_messages: row.get(6)?,
        assistant_messages: row.get(7)?,
        error_messages: row.get(8)?,
        fallback_messages: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::round1;

    #[test]
    fn test_round1() {
        assert_eq!(round1(0.0), 0.0);
        assert_eq!(round1(1.25), 1.3);
        assert_eq!(round1(1.24), 1.2);
        assert_eq!(round1(2.0 / 3.0), 0.7);
    }
}
