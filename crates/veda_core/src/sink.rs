//! Optional append-only persistence for chat messages.
//!
//! The runtime never reads from the sink at turn time; it exists for
//! long-term history and analytics pipelines downstream.

use std::path::Path;
use std::sync::Mutex;

use crate::error::{CoreError, Result};
use crate::message::Message;

/// Narrow append-only interface the runner writes through.
pub trait MessageSink: Send + Sync {
    fn append(&self, session_id: &str, message: &Message, agent_name: Option<&str>) -> Result<()>;
}

/// Discards everything. The default when no store is wired.
#[derive(Debug, Default)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn append(&self, _session_id: &str, _message: &Message, _agent_name: Option<&str>) -> Result<()> {
        Ok(())
    }
}

/// One row per appended message.
const MESSAGES_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    agent_name TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id);
";

/// SQLite-backed sink with WAL enabled. Writes are serialized through a
/// mutex; append volume is one row per chat message.
pub struct SqliteSink {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::Sink(format!("create sink dir: {}", e)))?;
        }
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| CoreError::Sink(format!("open {}: {}", path.display(), e)))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .map_err(|e| CoreError::Sink(e.to_string()))?;
        conn.execute_batch(MESSAGES_SCHEMA)
            .map_err(|e| CoreError::Sink(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn count(&self, session_id: &str) -> Result<u64> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Sink("sink lock poisoned".to_string()))?;
        let count: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                [session_id],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::Sink(e.to_string()))?;
        Ok(count)
    }
}

impl MessageSink for SqliteSink {
    fn append(&self, session_id: &str, message: &Message, agent_name: Option<&str>) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Sink("sink lock poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO messages (session_id, role, content, timestamp, agent_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                session_id,
                message.role.as_str(),
                message.content,
                message.timestamp.to_rfc3339(),
                agent_name,
            ],
        )
        .map_err(|e| CoreError::Sink(e.to_string()))?;
        Ok(())
    }
}
