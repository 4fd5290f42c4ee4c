//! Stored sentiment messages.
//!
//! Plain text records kept alongside the analysis endpoint. Analysis
//! results themselves are never persisted.

use crate::store::{
    db_error, format_timestamp, lock, open_connection, parse_timestamp, require_text,
};
use chrono::{DateTime, Utc};
use profiles_common::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const MAX_MESSAGE_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageItem {
    pub id: i64,
    pub message: String,
    pub created_on: DateTime<Utc>,
}

/// Body for creating or replacing a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct MessageStore {
    conn: Arc<Mutex<Connection>>,
}

impl MessageStore {
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = open_connection(db_path)?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS sentiment_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message TEXT NOT NULL,
                created_on TEXT NOT NULL
            );
            ",
        )
        .map_err(db_error)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn create(&self, message: Option<&str>) -> Result<MessageItem> {
        let message = require_text("message", message, MAX_MESSAGE_CHARS)?;
        let now = Utc::now();

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO sentiment_messages (message, created_on) VALUES (?1, ?2)",
            params![message, format_timestamp(&now)],
        )
        .map_err(db_error)?;

        Ok(MessageItem {
            id: conn.last_insert_rowid(),
            message,
            created_on: now,
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<MessageItem>> {
        let conn = lock(&self.conn)?;
        conn.query_row(
            "SELECT id, message, created_on FROM sentiment_messages WHERE id = ?1",
            params![id],
            row_to_message,
        )
        .optional()
        .map_err(db_error)
    }

    pub fn list(&self, limit: u32, offset: u32) -> Result<Vec<MessageItem>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, message, created_on FROM sentiment_messages
                 ORDER BY id ASC LIMIT ?1 OFFSET ?2",
            )
            .map_err(db_error)?;

        let messages = stmt
            .query_map(params![limit, offset], row_to_message)
            .map_err(db_error)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_error)?;
        Ok(messages)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sentiment_messages", [], |row| row.get(0))
            .map_err(db_error)?;
        Ok(count as u64)
    }

    pub fn update(&self, id: i64, message: Option<&str>) -> Result<Option<MessageItem>> {
        let message = require_text("message", message, MAX_MESSAGE_CHARS)?;
        {
            let conn = lock(&self.conn)?;
            let rows = conn
                .execute(
                    "UPDATE sentiment_messages SET message = ?1 WHERE id = ?2",
                    params![message, id],
                )
                .map_err(db_error)?;
            if rows == 0 {
                return Ok(None);
            }
        }
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = lock(&self.conn)?;
        let rows = conn
            .execute("DELETE FROM sentiment_messages WHERE id = ?1", params![id])
            .map_err(db_error)?;
        Ok(rows > 0)
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<MessageItem> {
    let created_on: String = row.get(2)?;
    Ok(MessageItem {
        id: row.get(0)?,
        message: row.get(1)?,
        created_on: parse_timestamp(&created_on),
    })
}
