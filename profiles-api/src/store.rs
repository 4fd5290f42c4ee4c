//! SQLite helpers shared by the profile, feed, and message stores.

use chrono::{DateTime, SecondsFormat, Utc};
use profiles_common::{Error, Result};
use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Default page size when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Largest page a client may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Open a connection with foreign keys enforced.
pub fn open_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(db_path).map_err(db_error)?;
    conn.busy_timeout(Duration::from_secs(5)).map_err(db_error)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(db_error)?;
    Ok(conn)
}

/// Lock a connection, mapping a poisoned mutex to an internal error.
pub fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| Error::Internal(format!("database lock poisoned: {e}")))
}

pub fn db_error(err: rusqlite::Error) -> Error {
    Error::Internal(format!("database error: {err}"))
}

/// True when the error is a UNIQUE/FOREIGN KEY/CHECK violation.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored RFC 3339 timestamp.
pub fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Pagination query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PaginationQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl PaginationQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// Validate a required text field: trimmed non-empty and at most `max_chars`.
pub fn require_text(field: &str, value: Option<&str>, max_chars: usize) -> Result<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{field} may not be blank")));
    }
    if profiles_common::util::char_len(value) > max_chars {
        return Err(Error::InvalidInput(format!(
            "{field} must have no more than {max_chars} characters"
        )));
    }
    Ok(value.to_string())
}
