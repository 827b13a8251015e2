// web-server/src/message_log.rs
//! Append-only chat transcript stored in SQLite.
//!
//! Calls block on the connection mutex and on disk I/O; handlers drive them
//! through `web::block`.

use std::path::Path;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use common::models::{ChatMessage, Sender};
use rusqlite::Connection;
use thiserror::Error;

/// Path value that selects a throwaway in-memory database
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Error)]
pub enum MessageLogError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("cannot prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("message log lock poisoned")]
    Poisoned,

    #[error("corrupt row {id}: {detail}")]
    CorruptRow { id: i64, detail: String },
}

pub struct MessageLog {
    conn: Mutex<Connection>,
}

impl MessageLog {
    /// Open or create the log at `path`. `:memory:` opens an in-memory database.
    pub fn open(path: &str) -> Result<Self, MessageLogError> {
        let conn = if path == IN_MEMORY {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let conn = Connection::open(path)?;
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            conn
        };

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );",
        )?;

        tracing::info!(path, "Message log opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self, MessageLogError> {
        Self::open(IN_MEMORY)
    }

    /// Persist one entry and return it with its assigned id
    pub fn append(&self, sender: Sender, content: &str) -> Result<ChatMessage, MessageLogError> {
        let conn = self.conn.lock().map_err(|_| MessageLogError::Poisoned)?;

        let created_at_ms = Utc::now().timestamp_millis();
        conn.prepare_cached("INSERT INTO messages (sender, content, created_at) VALUES (?1, ?2, ?3)")?
            .execute(rusqlite::params![sender.as_str(), content, created_at_ms])?;
        let id = conn.last_insert_rowid();

        tracing::debug!(id, sender = %sender, "Message stored");
        to_message(id, sender.as_str().to_string(), content.to_string(), created_at_ms)
    }

    /// Every stored entry in insertion order
    pub fn history(&self) -> Result<Vec<ChatMessage>, MessageLogError> {
        let conn = self.conn.lock().map_err(|_| MessageLogError::Poisoned)?;

        let mut stmt = conn.prepare_cached("SELECT id, sender, content, created_at FROM messages ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get(1)?, row.get(2)?, row.get::<_, i64>(3)?))
            })?
            .collect::<Result<Vec<(i64, String, String, i64)>, _>>()?;

        rows.into_iter()
            .map(|(id, sender, content, created_at)| to_message(id, sender, content, created_at))
            .collect()
    }
}

fn to_message(id: i64, sender: String, content: String, created_at_ms: i64) -> Result<ChatMessage, MessageLogError> {
    let sender = sender
        .parse::<Sender>()
        .map_err(|detail| MessageLogError::CorruptRow { id, detail })?;
    let created_at = Utc
        .timestamp_millis_opt(created_at_ms)
        .single()
        .ok_or_else(|| MessageLogError::CorruptRow { id, detail: format!("bad timestamp {}", created_at_ms) })?;

    Ok(ChatMessage { id, sender, content, created_at })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_ids() {
        let log = MessageLog::in_memory().unwrap();
        let first = log.append(Sender::Client, "hi").unwrap();
        let second = log.append(Sender::Server, "Hello back!").unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.sender, Sender::Client);
        assert_eq!(second.content, "Hello back!");
    }

    #[test]
    fn test_history_in_insertion_order() {
        let log = MessageLog::in_memory().unwrap();
        assert!(log.history().unwrap().is_empty());

        log.append(Sender::Client, "one").unwrap();
        log.append(Sender::Server, "two").unwrap();
        log.append(Sender::Remote, "three").unwrap();

        let history = log.history().unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(history[2].sender, Sender::Remote);
    }

    #[test]
    fn test_history_matches_appended_entries() {
        let log = MessageLog::in_memory().unwrap();
        let stored = log.append(Sender::Client, "<b>raw</b> & unescaped").unwrap();
        assert_eq!(log.history().unwrap(), vec![stored]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.db");
        let path = path.to_str().unwrap();

        {
            let log = MessageLog::open(path).unwrap();
            log.append(Sender::Client, "kept").unwrap();
        }

        let reopened = MessageLog::open(path).unwrap();
        let history = reopened.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "kept");
    }

    #[test]
    fn test_unknown_sender_is_corrupt_row() {
        let log = MessageLog::in_memory().unwrap();
        log.conn
            .lock()
            .unwrap()
            .execute("INSERT INTO messages (sender, content, created_at) VALUES ('bot', 'x', 0)", [])
            .unwrap();

        assert!(matches!(log.history(), Err(MessageLogError::CorruptRow { .. })));
    }
}
