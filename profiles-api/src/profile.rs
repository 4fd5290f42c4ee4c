//! User profile storage.
//!
//! Profiles are identified by email. Passwords are stored as Argon2 hashes
//! and never serialized.

use crate::store::{
    db_error, format_timestamp, is_constraint_violation, lock, open_connection, parse_timestamp,
    require_text,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use profiles_common::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const MAX_NAME_CHARS: usize = 255;
pub const MIN_PASSWORD_CHARS: usize = 8;

const SELECT_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, created_at";

/// Profile record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    /// Argon2 password hash (never exposed in API responses)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new profile, as received from the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl From<NewProfile> for ProfileChanges {
    fn from(profile: NewProfile) -> Self {
        Self {
            email: profile.email,
            name: profile.name,
            password: profile.password,
        }
    }
}

/// Profile store backed by SQLite.
#[derive(Clone)]
pub struct ProfileStore {
    conn: Arc<Mutex<Connection>>,
}

impl ProfileStore {
    /// Open (and migrate) the profile table at the given database path.
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = open_connection(db_path)?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS user_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_staff INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_user_profiles_name ON user_profiles(name);
            ",
        )
        .map_err(db_error)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a profile after validating and normalizing its fields.
    pub fn create(&self, request: &NewProfile) -> Result<UserProfile> {
        let email = normalize_email(request.email.as_deref())?;
        let name = require_text("name", request.name.as_deref(), MAX_NAME_CHARS)?;
        let password = validate_password(request.password.as_deref())?;
        let password_hash = hash_password(password)?;
        let now = Utc::now();

        let conn = lock(&self.conn)?;
        conn.execute(
            r"
            INSERT INTO user_profiles (email, name, password_hash, is_active, is_staff, created_at)
            VALUES (?1, ?2, ?3, 1, 0, ?4)
            ",
            params![email, name, password_hash, format_timestamp(&now)],
        )
        .map_err(|e| conflict_or_db(e, &email))?;

        let id = conn.last_insert_rowid();
        tracing::info!(profile_id = id, "Created user profile");

        Ok(UserProfile {
            id,
            email,
            name,
            password_hash,
            is_active: true,
            is_staff: false,
            created_at: now,
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<UserProfile>> {
        let conn = lock(&self.conn)?;
        get_by(&conn, "id", &id)
    }

    /// Look up a profile by email (domain part compared case-insensitively).
    pub fn get_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let Ok(email) = normalize_email(Some(email)) else {
            return Ok(None);
        };
        let conn = lock(&self.conn)?;
        get_by(&conn, "email", &email)
    }

    /// Apply changes to a profile; returns `None` when it does not exist.
    pub fn update(&self, id: i64, changes: &ProfileChanges) -> Result<Option<UserProfile>> {
        let email = changes
            .email
            .as_deref()
            .map(|e| normalize_email(Some(e)))
            .transpose()?;
        let name = changes
            .name
            .as_deref()
            .map(|n| require_text("name", Some(n), MAX_NAME_CHARS))
            .transpose()?;
        let password_hash = changes
            .password
            .as_deref()
            .map(|p| validate_password(Some(p)).and_then(hash_password))
            .transpose()?;

        let conn = lock(&self.conn)?;
        if get_by(&conn, "id", &id)?.is_none() {
            return Ok(None);
        }

        if let Some(email) = &email {
            conn.execute(
                "UPDATE user_profiles SET email = ?1 WHERE id = ?2",
                params![email, id],
            )
            .map_err(|e| conflict_or_db(e, email))?;
        }

        if let Some(name) = &name {
            conn.execute(
                "UPDATE user_profiles SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .map_err(db_error)?;
        }

        if let Some(hash) = &password_hash {
            conn.execute(
                "UPDATE user_profiles SET password_hash = ?1 WHERE id = ?2",
                params![hash, id],
            )
            .map_err(db_error)?;
        }

        get_by(&conn, "id", &id)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = lock(&self.conn)?;
        let rows = conn
            .execute("DELETE FROM user_profiles WHERE id = ?1", params![id])
            .map_err(db_error)?;
        if rows > 0 {
            tracing::info!(profile_id = id, "Deleted user profile");
        }
        Ok(rows > 0)
    }

    /// List profiles, optionally filtered by a case-insensitive substring of
    /// name or email.
    pub fn list(&self, search: Option<&str>, limit: u32, offset: u32) -> Result<Vec<UserProfile>> {
        let conn = lock(&self.conn)?;
        let pattern = search_pattern(search);

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM user_profiles
                 WHERE ?1 IS NULL OR name LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\'
                 ORDER BY id ASC LIMIT ?2 OFFSET ?3"
            ))
            .map_err(db_error)?;

        let profiles = stmt
            .query_map(params![pattern, limit, offset], row_to_profile)
            .map_err(db_error)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_error)?;

        Ok(profiles)
    }

    /// Count profiles matching the same filter as [`Self::list`].
    pub fn count(&self, search: Option<&str>) -> Result<u64> {
        let conn = lock(&self.conn)?;
        let pattern = search_pattern(search);
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM user_profiles
                 WHERE ?1 IS NULL OR name LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\'",
                params![pattern],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        Ok(count as u64)
    }

    /// Check credentials; inactive profiles never authenticate.
    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<UserProfile>> {
        let Some(profile) = self.get_by_email(email)? else {
            return Ok(None);
        };

        if !profile.is_active || !verify_password(password, &profile.password_hash)? {
            return Ok(None);
        }

        Ok(Some(profile))
    }
}

fn get_by(conn: &Connection, field: &str, value: &dyn rusqlite::ToSql) -> Result<Option<UserProfile>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM user_profiles WHERE {field} = ?1"),
        params![value],
        row_to_profile,
    )
    .optional()
    .map_err(db_error)
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    let created_at: String = row.get(6)?;
    Ok(UserProfile {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        is_staff: row.get::<_, i64>(5)? != 0,
        created_at: parse_timestamp(&created_at),
    })
}

fn conflict_or_db(err: rusqlite::Error, email: &str) -> Error {
    if is_constraint_violation(&err) {
        Error::Conflict(format!("A profile with email '{email}' already exists"))
    } else {
        db_error(err)
    }
}

/// `%term%` LIKE pattern with wildcards in the term escaped.
fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

/// Trim an email and lower-case its domain part.
pub fn normalize_email(email: Option<&str>) -> Result<String> {
    let email = email.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(Error::InvalidInput("email may not be blank".into()));
    }

    match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(format!("{local}@{}", domain.to_lowercase()))
        }
        _ => Err(Error::InvalidInput("Enter a valid email address".into())),
    }
}

fn validate_password(password: Option<&str>) -> Result<&str> {
    match password {
        Some(p) if p.chars().count() >= MIN_PASSWORD_CHARS => Ok(p),
        Some(_) => Err(Error::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        ))),
        None => Err(Error::InvalidInput("password is required".into())),
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("Failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::Internal(format!("Invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
