//! Session transcript export.

use crate::db::ChatDb;
use crate::error::{Error, Result};
use crate::types::{Message, Session, SessionExport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Structured dump of the session and all its messages
    Json,
    /// Plain-text transcript
    Txt,
    /// Markdown transcript
    Md,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "txt" => Ok(ExportFormat::Txt),
            "md" => Ok(ExportFormat::Md),
            _ => Err(Error::Validation(format!(
                "unsupported export format '{}': expected one of json, txt, md",
                s
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Txt => write!(f, "txt"),
            ExportFormat::Md => write!(f, "md"),
        }
    }
}

impl ChatDb {
    /// Render a session transcript in the requested format.
    ///
    /// Owner-scoped like [`ChatDb::get_session`]; soft-deleted sessions stay
    /// exportable by id.
    pub fn export_session(
        &self,
        user_id: &str,
        session_id: &str,
        format: ExportFormat,
    ) -> Result<String> {
        let session = self.get_session(user_id, session_id)?;
        let messages = self.list_messages(session_id)?;

        match format {
            ExportFormat::Json => {
                Ok(serde_json::to_string_pretty(&SessionExport { session, messages })?)
            }
            ExportFormat::Txt => Ok(render_txt(&session, &messages)),
            ExportFormat::Md => Ok(render_md(&session, &messages)),
        }
    }
}

fn datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn render_txt(session: &Session, messages: &[Message]) -> String {
    let mut out = format!(
        "Chat: {}\nDate: {}\n\n",
        session.title,
        datetime(session.created_at).format("%Y-%m-%d %H:%M")
    );

    for msg in messages {
        out.push_str(&format!(
            "[{}] {}:\n{}\n\n",
            datetime(msg.created_at).format("%H:%M"),
            msg.role.label(),
            msg.content
        ));
    }

    out
}

fn render_md(session: &Session, messages: &[Message]) -> String {
    let mut out = format!(
        "# {}\n\n**Date:** {}\n\n",
        session.title,
        datetime(session.created_at).format("%Y-%m-%d %H:%M")
    );

    for msg in messages {
        out.push_str(&format!(
            "### **{}** ({})\n\n{}\n\n---\n\n",
            msg.role.label(),
            datetime(msg.created_at).format("%H:%M"),
            msg.content
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn sample_session() -> Session {
        Session {
            id: 1,
            session_id: "s-1".to_string(),
            user_id: "u-1".to_string(),
            title: "Headache question".to_string(),
            is_active: true,
            total_messages: 2,
            total_tokens_used: 0,
            last_message_preview: None,
            created_at: 1_700_000_000_000, // 2023-11-14 22:13 UTC
            updated_at: 1_700_000_000_000,
        }
    }

    fn sample_messages() -> Vec<Message> {
        vec![
            Message {
                id: 1,
                uuid: "m-1".to_string(),
                session_id: "s-1".to_string(),
                role: Role::User,
                content: "I have a headache".to_string(),
                tokens_used: 0,
                is_error: false,
                is_fallback: false,
                response_time_ms: None,
                metadata: None,
                created_at: 1_700_000_000_000,
            },
            Message {
                id: 2,
                uuid: "m-2".to_string(),
                session_id: "s-1".to_string(),
                role: Role::Assistant,
                content: "How long has this persisted?".to_string(),
                tokens_used: 12,
                is_error: false,
                is_fallback: false,
                response_time_ms: Some(420),
                metadata: None,
                created_at: 1_700_000_060_000,
            },
        ]
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("TXT".parse::<ExportFormat>().unwrap(), ExportFormat::Txt);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Md);

        let err = "pdf".parse::<ExportFormat>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("json") && msg.contains("txt") && msg.contains("md"));
    }

    #[test]
    fn test_render_txt_layout() {
        let out = render_txt(&sample_session(), &sample_messages());

        assert!(out.starts_with("Chat: Headache question\nDate: 2023-11-14 22:13\n\n"));
        assert!(out.contains("[22:13] User:\nI have a headache\n\n"));
        assert!(out.contains("[22:14] Assistant:\nHow long has this persisted?\n\n"));

        // User block precedes the assistant block
        let user_pos = out.find("User:").unwrap();
        let assistant_pos = out.find("Assistant:").unwrap();
        assert!(user_pos < assistant_pos);
    }

    #[test]
    fn test_render_md_layout() {
        let out = render_md(&sample_session(), &sample_messages());

        assert!(out.starts_with("# Headache question\n\n**Date:** 2023-11-14 22:13\n\n"));
        assert!(out.contains("### **User** (22:13)\n\nI have a headache\n\n---\n\n"));
        assert!(out.contains("### **Assistant** (22:14)"));
        assert_eq!(out.matches("---").count(), 2);
    }

    #[test]
    fn test_render_empty_session() {
        let out = render_txt(&sample_session(), &[]);
        assert_eq!(out, "Chat: Headache question\nDate: 2023-11-14 22:13\n\n");
    }
}
