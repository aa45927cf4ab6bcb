//! Database configuration.

use std::path::PathBuf;

/// Message-count threshold for the auto-title heuristic.
///
/// The legacy behavior titles a session from its first user message while
/// the stored count is still at most 2, which can fire on the second user
/// turn as well depending on timing. Kept configurable instead of "fixed".
pub const DEFAULT_AUTO_TITLE_THRESHOLD: i64 = 2;

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Connection URL
    /// - local: a filesystem path to the SQLite file
    /// - remote: "libsql://host:port" (not supported yet)
    pub url: String,

    /// Connection mode
    pub mode: ConnectionMode,

    /// Pre-insert message count at or below which a user message overwrites
    /// the session title. See [`DEFAULT_AUTO_TITLE_THRESHOLD`].
    pub auto_title_message_threshold: i64,
}

/// Connection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Local SQLite file
    Local,
    /// Remote libSQL (future)
    Remote,
}

impl DbConfig {
    /// Create a local SQLite configuration.
    pub fn local<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        Self {
            url: path.display().to_string(),
            mode: ConnectionMode::Local,
            auto_title_message_threshold: DEFAULT_AUTO_TITLE_THRESHOLD,
        }
    }

    /// Build the configuration from the environment, falling back to the
    /// default location under the home directory.
    pub fn from_env() -> Self {
        if let Ok(url) = std::env::var("CHAT_HISTORY_DB_URL") {
            if url.starts_with("libsql://") {
                return Self {
                    url,
                    mode: ConnectionMode::Remote,
                    auto_title_message_threshold: DEFAULT_AUTO_TITLE_THRESHOLD,
                };
            }
            return Self::local(url);
        }

        // Default path: ~/.chat-history/db/chat-history.db
        let default_path = dirs::home_dir()
            .map(|h| h.join(".chat-history").join("db").join("chat-history.db"))
            .unwrap_or_else(|| PathBuf::from("chat-history.db"));

        Self::local(default_path)
    }

    /// Database file path (local mode only).
    pub fn path(&self) -> Option<PathBuf> {
        match self.mode {
            ConnectionMode::Local => Some(PathBuf::from(&self.url)),
            ConnectionMode::Remote => None,
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
