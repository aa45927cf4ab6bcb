//! Database connection and core operations.

use crate::config::{ConnectionMode, DbConfig};
use crate::error::{Error, Result};
use crate::migrations;
use crate::schema;
use crate::types::{truncate_with_ellipsis, Message, NewMessage, Role, Session};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Default page size for session listings.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Hard cap on caller-supplied page sizes.
pub const MAX_PAGE_SIZE: usize = 100;

/// Maximum preview length in characters.
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Title given to sessions created without one.
pub const DEFAULT_SESSION_TITLE: &str = "New chat";

const SESSION_COLUMNS: &str = "id, session_id, user_id, title, is_active, total_messages, \
     total_tokens_used, last_message_preview, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, uuid, session_id, role, content, tokens_used, is_error, \
     is_fallback, response_time_ms, metadata, created_at";

/// Database handle. Cheap to clone via the inner `Arc`; a single mutex-held
/// connection serializes writers, so aggregate recomputation cannot race.
pub struct ChatDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
    pub(crate) config: DbConfig,
}

impl ChatDb {
    /// Connect to the database.
    pub fn connect(config: DbConfig) -> Result<Self> {
        match config.mode {
            ConnectionMode::Local => Self::connect_local(config),
            ConnectionMode::Remote => Err(Error::Config("remote connections not supported".into())),
        }
    }

    /// Connect to a local SQLite file.
    fn connect_local(config: DbConfig) -> Result<Self> {
        let path = Path::new(&config.url);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Migrations run before the schema so older databases gain missing
        // columns first; on a fresh file they are a no-op.
        migrations::run_migrations(&conn)?;
        conn.execute_batch(schema::SCHEMA_SQL)?;

        tracing::info!("database connected: {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        })
    }

    /// Underlying connection (for tests).
    #[doc(hidden)]
    pub fn connection(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }

    // ==================== Session operations ====================

    /// Create a new session. Starts active with zeroed aggregates; the title
    /// defaults to [`DEFAULT_SESSION_TITLE`] when not supplied.
    pub fn create_session(&self, user_id: &str, title: Option<&str>) -> Result<Session> {
        let conn = self.conn.lock();
        let session_id = Uuid::new_v4().to_string();
        let title = match title {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_SESSION_TITLE,
        };
        let now = current_time_ms();

        conn.execute(
            "INSERT INTO sessions (session_id, user_id, title, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![session_id, user_id, title, now],
        )?;

        get_session_scoped(&conn, user_id, &session_id)?
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))
    }

    /// List the user's active sessions, most recently updated first.
    ///
    /// `limit` is clamped to [`MAX_PAGE_SIZE`]; 0 selects the default page
    /// size.
    pub fn list_sessions(&self, user_id: &str, limit: usize, offset: usize) -> Result<Vec<Session>> {
        let limit = if limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            limit.min(MAX_PAGE_SIZE)
        };

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE user_id = ?1 AND is_active = 1 \
             ORDER BY updated_at DESC \
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(params![user_id, limit as i64, offset as i64], map_session)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Fetch a single session, scoped to its owner.
    ///
    /// Does not filter on the active flag, so a soft-deleted session stays
    /// retrievable by id (export needs this). A session owned by someone else
    /// fails with `NotFound`, same as an absent one.
    pub fn get_session(&self, user_id: &str, session_id: &str) -> Result<Session> {
        let conn = self.conn.lock();
        get_session_scoped(&conn, user_id, session_id)?
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))
    }

    /// Update a session title.
    pub fn rename_session(&self, user_id: &str, session_id: &str, title: &str) -> Result<()> {
        let conn = self.conn.lock();
        let now = current_time_ms();

        let count = conn.execute(
            "UPDATE sessions SET title = ?1, updated_at = ?2 \
             WHERE session_id = ?3 AND user_id = ?4",
            params![title, now, session_id, user_id],
        )?;

        if count == 0 {
            return Err(Error::NotFound(format!("session {}", session_id)));
        }
        Ok(())
    }

    /// Soft-delete a session: the row and its messages remain, only the
    /// active flag flips.
    pub fn soft_delete_session(&self, user_id: &str, session_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        let now = current_time_ms();

        let count = conn.execute(
            "UPDATE sessions SET is_active = 0, updated_at = ?1 \
             WHERE session_id = ?2 AND user_id = ?3",
            params![now, session_id, user_id],
        )?;

        if count == 0 {
            return Err(Error::NotFound(format!("session {}", session_id)));
        }
        Ok(())
    }

    /// Soft-delete a set of sessions atomically.
    ///
    /// All-or-nothing: every id must exist, belong to the caller, and still
    /// be active, otherwise no row is modified and a validation error is
    /// returned. Returns the number of sessions deactivated.
    pub fn bulk_soft_delete(&self, user_id: &str, session_ids: &[String]) -> Result<usize> {
        if session_ids.is_empty() {
            return Err(Error::Validation("session_ids list is required".into()));
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let placeholders: String = session_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::with_capacity(session_ids.len() + 1);
        for id in session_ids {
            params_vec.push(Box::new(id.clone()));
        }
        params_vec.push(Box::new(user_id.to_string()));
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let matched: i64 = tx.query_row(
            &format!(
                "SELECT COUNT(*) FROM sessions \
                 WHERE session_id IN ({placeholders}) AND user_id = ? AND is_active = 1"
            ),
            params_refs.as_slice(),
            |row| row.get(0),
        )?;

        if matched as usize != session_ids.len() {
            // Dropping the transaction rolls back; nothing was written yet.
            return Err(Error::Validation(
                "some sessions were not found or do not belong to you".into(),
            ));
        }

        let now = current_time_ms();
        let mut update_params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];
        update_params.extend(params_vec);
        let update_refs: Vec<&dyn rusqlite::ToSql> = update_params.iter().map(|p| p.as_ref()).collect();

        let updated = tx.execute(
            &format!(
                "UPDATE sessions SET is_active = 0, updated_at = ? \
                 WHERE session_id IN ({placeholders}) AND user_id = ? AND is_active = 1"
            ),
            update_refs.as_slice(),
        )?;

        tx.commit()?;
        Ok(updated)
    }

    // ==================== Aggregate maintenance ====================

    /// Recompute `total_messages` from the messages table. Persists only the
    /// count and the updated timestamp; returns the new count.
    pub fn recompute_message_count(&self, session_id: &str) -> Result<i64> {
        let conn = self.conn.lock();
        refresh_message_count(&conn, session_id, current_time_ms()).map_err(Into::into)
    }

    /// Recompute `last_message_preview` from the latest assistant-authored
    /// message. When the session has no assistant message the stored preview
    /// is left untouched. Returns the preview that was persisted, if any.
    pub fn recompute_last_preview(&self, session_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        refresh_last_preview(&conn, session_id, current_time_ms()).map_err(Into::into)
    }

    // ==================== Message operations ====================

    /// Append a message to a session.
    ///
    /// The insert and the aggregate recomputation (message count, and for
    /// assistant messages the preview) run in one transaction, so concurrent
    /// appends serialize instead of racing the counters. There is no insert
    /// path that skips the recomputation.
    pub fn append_message(&self, session_id: &str, input: &NewMessage) -> Result<Message> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let exists: i64 = tx.query_row(
            "SELECT COUNT(*) FROM sessions WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(Error::NotFound(format!("session {}", session_id)));
        }

        let now = current_time_ms();
        let rowid = insert_message(&tx, session_id, input, now)?;
        refresh_message_count(&tx, session_id, now)?;
        if input.role == Role::Assistant {
            refresh_last_preview(&tx, session_id, now)?;
        }

        let message = get_message_by_rowid(&tx, rowid)?;
        tx.commit()?;
        Ok(message)
    }

    /// Full transcript of a session, in chronological (insertion) order.
    /// Unbounded; callers with very large sessions paginate upstream.
    pub fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE session_id = ?1 \
             ORDER BY created_at ASC, id ASC"
        ))?;

        let rows = stmt.query_map(params![session_id], map_message)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

// ==================== Row mapping ====================

fn map_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
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
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let role: String = row.get(3)?;
    let is_error: i64 = row.get(6)?;
    let is_fallback: i64 = row.get(7)?;
    Ok(Message {
        id: row.get(0)?,
        uuid: row.get(1)?,
        session_id: row.get(2)?,
        role: role.parse().unwrap_or(Role::User),
        content: row.get(4)?,
        tokens_used: row.get(5)?,
        is_error: is_error != 0,
        is_fallback: is_fallback != 0,
        response_time_ms: row.get(8)?,
        metadata: row.get(9)?,
        created_at: row.get(10)?,
    })
}

// ==================== Shared write-path helpers ====================
// Take a plain `&Connection` so `writer::record_message` can compose them
// into its own transaction.

pub(crate) fn get_session_scoped(
    conn: &Connection,
    user_id: &str,
    session_id: &str,
) -> Result<Option<Session>> {
    conn.query_row(
        &format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE session_id = ?1 AND user_id = ?2"
        ),
        params![session_id, user_id],
        map_session,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn insert_message(
    conn: &Connection,
    session_id: &str,
    input: &NewMessage,
    now: i64,
) -> rusqlite::Result<i64> {
    let uuid = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO messages (uuid, session_id, role, content, tokens_used, is_error, \
         is_fallback, response_time_ms, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            uuid,
            session_id,
            input.role.to_string(),
            input.content,
            input.tokens_used,
            input.is_error as i64,
            input.is_fallback as i64,
            input.response_time_ms,
            input.metadata,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn refresh_message_count(
    conn: &Connection,
    session_id: &str,
    now: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "UPDATE sessions SET \
            total_messages = (SELECT COUNT(*) FROM messages WHERE session_id = ?1), \
            updated_at = ?2 \
         WHERE session_id = ?1",
        params![session_id, now],
    )?;

    conn.query_row(
        "SELECT total_messages FROM sessions WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )
}

pub(crate) fn refresh_last_preview(
    conn: &Connection,
    session_id: &str,
    now: i64,
) -> rusqlite::Result<Option<String>> {
    let latest: Option<String> = conn
        .query_row(
            "SELECT content FROM messages \
             WHERE session_id = ?1 AND role = 'assistant' \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1",
            params![session_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(content) = latest else {
        return Ok(None);
    };

    let preview = truncate_with_ellipsis(&content, PREVIEW_MAX_CHARS);
    conn.execute(
        "UPDATE sessions SET last_message_preview = ?1, updated_at = ?2 WHERE session_id = ?3",
        params![preview, now, session_id],
    )?;

    Ok(Some(preview))
}

pub(crate) fn get_message_by_rowid(conn: &Connection, rowid: i64) -> rusqlite::Result<Message> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
        params![rowid],
        map_message,
    )
}

/// Current time in Unix milliseconds.
pub(crate) fn current_time_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
