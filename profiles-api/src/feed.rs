//! Profile status feed storage.

use crate::store::{
    db_error, format_timestamp, lock, open_connection, parse_timestamp, require_text,
};
use chrono::{DateTime, Utc};
use profiles_common::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const MAX_STATUS_CHARS: usize = 255;

/// A status update posted by a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: i64,
    /// Owning profile; always the author, never client-supplied.
    pub user_profile: i64,
    pub status_text: String,
    pub created_on: DateTime<Utc>,
}

/// Body for creating or replacing a feed item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedItemRequest {
    #[serde(default)]
    pub status_text: Option<String>,
}

/// Feed store backed by SQLite.
#[derive(Clone)]
pub struct FeedStore {
    conn: Arc<Mutex<Connection>>,
}

impl FeedStore {
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = open_connection(db_path)?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS profile_feed_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_profile INTEGER NOT NULL
                    REFERENCES user_profiles(id) ON DELETE CASCADE,
                status_text TEXT NOT NULL,
                created_on TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_feed_user_profile ON profile_feed_items(user_profile);
            CREATE INDEX IF NOT EXISTS idx_feed_created_on ON profile_feed_items(created_on);
            ",
        )
        .map_err(db_error)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Post a status for `profile_id`.
    pub fn create(&self, profile_id: i64, status_text: Option<&str>) -> Result<FeedItem> {
        let status_text = require_text("status_text", status_text, MAX_STATUS_CHARS)?;
        let now = Utc::now();

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO profile_feed_items (user_profile, status_text, created_on) VALUES (?1, ?2, ?3)",
            params![profile_id, status_text, format_timestamp(&now)],
        )
        .map_err(db_error)?;

        let id = conn.last_insert_rowid();
        tracing::debug!(feed_item_id = id, profile_id, "Posted status");

        Ok(FeedItem {
            id,
            user_profile: profile_id,
            status_text,
            created_on: now,
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<FeedItem>> {
        let conn = lock(&self.conn)?;
        conn.query_row(
            "SELECT id, user_profile, status_text, created_on FROM profile_feed_items WHERE id = ?1",
            params![id],
            row_to_item,
        )
        .optional()
        .map_err(db_error)
    }

    /// Newest first.
    pub fn list(&self, limit: u32, offset: u32) -> Result<Vec<FeedItem>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_profile, status_text, created_on FROM profile_feed_items
                 ORDER BY created_on DESC, id DESC LIMIT ?1 OFFSET ?2",
            )
            .map_err(db_error)?;

        let items = stmt
            .query_map(params![limit, offset], row_to_item)
            .map_err(db_error)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_error)?;
        Ok(items)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM profile_feed_items", [], |row| row.get(0))
            .map_err(db_error)?;
        Ok(count as u64)
    }

    /// Replace the status text; returns `None` when the item does not exist.
    pub fn update(&self, id: i64, status_text: Option<&str>) -> Result<Option<FeedItem>> {
        let status_text = require_text("status_text", status_text, MAX_STATUS_CHARS)?;
        {
            let conn = lock(&self.conn)?;
            let rows = conn
                .execute(
                    "UPDATE profile_feed_items SET status_text = ?1 WHERE id = ?2",
                    params![status_text, id],
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
            .execute("DELETE FROM profile_feed_items WHERE id = ?1", params![id])
            .map_err(db_error)?;
        Ok(rows > 0)
    }
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<FeedItem> {
    let created_on: String = row.get(3)?;
    Ok(FeedItem {
        id: row.get(0)?,
        user_profile: row.get(1)?,
        status_text: row.get(2)?,
        created_on: parse_timestamp(&created_on),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{NewProfile, ProfileStore};
    use tempfile::tempdir;

    fn create_test_stores() -> (ProfileStore, FeedStore, i64, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("profiles.db");
        let profiles = ProfileStore::new(&db_path).unwrap();
        let feed = FeedStore::new(&db_path).unwrap();
        let author = profiles
            .create(&NewProfile {
                email: Some("author@example.com".into()),
                name: Some("Author".into()),
                password: Some("password123".into()),
            })
            .unwrap();
        (profiles, feed, author.id, dir)
    }

    #[test]
    fn test_create_and_get() {
        let (_profiles, feed, author, _dir) = create_test_stores();
        let item = feed.create(author, Some("  Hello world  ")).unwrap();

        assert_eq!(item.user_profile, author);
        assert_eq!(item.status_text, "Hello world");
        assert_eq!(feed.get(item.id).unwrap().unwrap(), item);
    }

    #[test]
    fn test_status_text_validation() {
        let (_profiles, feed, author, _dir) = create_test_stores();
        assert_eq!(feed.create(author, Some("")).unwrap_err().status_code(), 400);
        assert_eq!(feed.create(author, None).unwrap_err().status_code(), 400);

        let long = "x".repeat(MAX_STATUS_CHARS + 1);
        assert_eq!(feed.create(author, Some(&long)).unwrap_err().status_code(), 400);
        assert!(feed.create(author, Some(&"x".repeat(MAX_STATUS_CHARS))).is_ok());
    }

    #[test]
    fn test_list_newest_first() {
        let (_profiles, feed, author, _dir) = create_test_stores();
        let first = feed.create(author, Some("first")).unwrap();
        let second = feed.create(author, Some("second")).unwrap();

        let items = feed.list(100, 0).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, second.id);
        assert_eq!(items[1].id, first.id);
        assert_eq!(feed.count().unwrap(), 2);
    }

    #[test]
    fn test_update_and_delete() {
        let (_profiles, feed, author, _dir) = create_test_stores();
        let item = feed.create(author, Some("draft")).unwrap();

        let updated = feed.update(item.id, Some("final")).unwrap().unwrap();
        assert_eq!(updated.status_text, "final");
        assert!(feed.update(9999, Some("nothing")).unwrap().is_none());

        assert!(feed.delete(item.id).unwrap());
        assert!(feed.get(item.id).unwrap().is_none());
    }

    #[test]
    fn test_items_removed_with_profile() {
        let (profiles, feed, author, _dir) = create_test_stores();
        let item = feed.create(author, Some("orphan soon")).unwrap();

        assert!(profiles.delete(author).unwrap());
        assert!(feed.get(item.id).unwrap().is_none());
    }

    #[test]
    fn test_unknown_author_rejected() {
        let (_profiles, feed, _author, _dir) = create_test_stores();
        assert!(feed.create(424242, Some("ghost")).is_err());
    }
}
