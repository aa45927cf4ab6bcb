//! chat-history-db - chat history storage library
//!
//! Storage and service core for a chat-history backend: sessions exchanged
//! with an assistant, their messages, and per-user usage analytics, on top of
//! a local SQLite database.
//!
//! # Core functionality
//!
//! - **Sessions**: create / list / rename / soft-delete, with denormalized
//!   aggregates (message count, token total, last-assistant-message preview)
//!   maintained transactionally on every message insert
//! - **Messages**: append-only transcript per session, with the auto-title
//!   heuristic for early user messages
//! - **Statistics**: point-in-time per-user summary (totals, averages,
//!   most-active day, trailing-window counts) plus daily rollup reads
//! - **Search**: case-insensitive free-text filter over title, preview and
//!   message content
//! - **Export**: json / txt / md transcript rendering
//!
//! # Access scoping
//!
//! Every session and message operation is scoped to an owning `user_id`.
//! Records owned by a different user are reported as not found, never as
//! forbidden, so callers cannot probe for existence.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod migrations;
pub mod schema;
pub mod search;
pub mod stats;
pub mod types;
pub mod writer;

// Re-exports
pub use config::{DbConfig, DEFAULT_AUTO_TITLE_THRESHOLD};
pub use db::{
    ChatDb, DEFAULT_PAGE_SIZE, DEFAULT_SESSION_TITLE, MAX_PAGE_SIZE, PREVIEW_MAX_CHARS,
};
pub use error::{Error, Result};
pub use export::ExportFormat;
pub use search::SEARCH_RESULT_LIMIT;
pub use types::*;
