//! Write-path policy layered above plain message insertion.
//!
//! [`ChatDb::append_message`] is the raw primitive; `record_message` is what
//! the message-add endpoint calls: it scopes the session to its owner,
//! requires it to be active, and applies the auto-title heuristic for early
//! user messages.

use crate::db::{
    current_time_ms, get_message_by_rowid, insert_message, refresh_last_preview,
    refresh_message_count, ChatDb,
};
use crate::error::{Error, Result};
use crate::types::{truncate_with_ellipsis, Message, NewMessage, Role};
use rusqlite::{params, OptionalExtension};

/// Maximum auto-title length in characters.
const TITLE_MAX_CHARS: usize = 50;

impl ChatDb {
    /// Insert a message on behalf of a user.
    ///
    /// Fails with `NotFound` unless the session exists, belongs to the user,
    /// and is still active. Runs insert, aggregate recomputation and the
    /// title update in a single transaction.
    ///
    /// Auto-title: when the session's stored message count (read before the
    /// insert) is at most `DbConfig::auto_title_message_threshold` and the
    /// new message is user-authored with non-empty trimmed content, the
    /// session title becomes the first [`TITLE_MAX_CHARS`] characters of that
    /// content. Legacy behavior: with the default threshold of 2 this can
    /// fire on a second user turn as well, which is why the threshold is a
    /// config knob rather than a constant.
    pub fn record_message(
        &self,
        user_id: &str,
        session_id: &str,
        input: &NewMessage,
    ) -> Result<Message> {
        let threshold = self.config.auto_title_message_threshold;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let pre_count: Option<i64> = tx
            .query_row(
                "SELECT total_messages FROM sessions \
                 WHERE session_id = ?1 AND user_id = ?2 AND is_active = 1",
                params![session_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(pre_count) = pre_count else {
            return Err(Error::NotFound(format!("session {}", session_id)));
        };

        let now = current_time_ms();
        let rowid = insert_message(&tx, session_id, input, now)?;
        refresh_message_count(&tx, session_id, now)?;
        if input.role == Role::Assistant {
            refresh_last_preview(&tx, session_id, now)?;
        }

        if pre_count <= threshold
            && input.role == Role::User
            && !input.content.trim().is_empty()
        {
            let title = truncate_with_ellipsis(&input.content, TITLE_MAX_CHARS);
            tx.execute(
                "UPDATE sessions SET title = ?1 WHERE session_id = ?2",
                params![title, session_id],
            )?;
        }

        let message = get_message_by_rowid(&tx, rowid)?;
        tx.commit()?;
        Ok(message)
    }
}
