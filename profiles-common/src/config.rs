//! Configuration management for the profiles API.
//!
//! The service reads a single JSON file at `~/.profiles-api/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (PROFILES_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `PROFILES_BIND_ADDRESS` → network.bind
//! - `PROFILES_PORT` → network.port
//! - `PROFILES_JWT_SECRET` → auth.jwt_secret
//! - `PROFILES_DB_PATH` → storage.db_path
//! - `PROFILES_LOG_LEVEL` → observability.log_level
//! - `PROFILES_TRANSLATE_URL` → translation.endpoint
//! - `PROFILES_TRANSLATE_API_KEY` → translation.api_key
//! - `PROFILES_LEXICON_PATH` → sentiment.lexicon_path

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".profiles-api"),
        |dirs| dirs.home_dir().join(".profiles-api"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Where a full VADER lexicon is picked up when `sentiment.lexicon_path` is unset.
pub fn default_lexicon_path() -> PathBuf {
    config_dir().join("vader_lexicon.txt")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Listener configuration for the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Default is `127.0.0.1` (local only).
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout applied by the HTTP layer
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

// ============================================================================
// Auth Configuration
// ============================================================================

/// Token authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT signing secret (a development default is used if not set)
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Token expiry in seconds
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_expiry_secs: default_token_expiry(),
        }
    }
}

fn default_token_expiry() -> u64 {
    86400
}

// ============================================================================
// Storage Configuration
// ============================================================================

/// SQLite storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file path. Defaults to `profiles.db` in the config directory.
    #[serde(default)]
    pub db_path: Option<String>,
}

impl StorageConfig {
    /// Resolve the database path, falling back to the config directory.
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir().join("profiles.db"))
    }
}

// ============================================================================
// Translation Configuration
// ============================================================================

/// Translation and language-detection service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Base URL of a LibreTranslate-compatible service
    #[serde(default = "default_translate_endpoint")]
    pub endpoint: String,

    /// Optional API key sent with every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP timeout for a single upstream call
    #[serde(default = "default_translate_timeout")]
    pub timeout_secs: u64,

    /// Language detector: "remote" (the translation service's `/detect`) or
    /// "local" (in-process statistics, deferring to remote when unsure)
    #[serde(default = "default_detector")]
    pub detector: String,

    /// Extra attempts after a failed upstream call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay, doubled on every retry
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Upper bound for a single backoff delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translate_endpoint(),
            api_key: None,
            timeout_secs: default_translate_timeout(),
            detector: default_detector(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_translate_endpoint() -> String {
    "http://127.0.0.1:5000".into()
}

fn default_translate_timeout() -> u64 {
    10
}

fn default_detector() -> String {
    "remote".into()
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

// ============================================================================
// Sentiment Configuration
// ============================================================================

/// Sentiment scorer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Path to a VADER-format lexicon file. When unset, `vader_lexicon.txt`
    /// in the config directory is used if present, else the compact built-in
    /// lexicon.
    #[serde(default)]
    pub lexicon_path: Option<String>,
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Token authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// SQLite storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Translation service
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Sentiment scorer
    #[serde(default)]
    pub sentiment: SentimentConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at the expected path; defaults were used.
    Defaults(PathBuf),
}

/// A configuration plus the notices gathered while loading it.
///
/// Loading happens before logging is initialised, so nothing is logged
/// during the load itself. Call [`LoadedConfig::log_summary`] once the
/// subscriber is installed.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
    /// Environment overrides that were present but could not be applied.
    pub ignored_overrides: Vec<String>,
}

impl LoadedConfig {
    pub fn log_summary(&self) {
        match &self.source {
            ConfigSource::File(path) => {
                tracing::info!(path = %path.display(), "Loaded config file");
            }
            ConfigSource::Defaults(path) => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
            }
        }
        for notice in &self.ignored_overrides {
            tracing::warn!("{notice}");
        }
    }
}

impl Config {
    /// Load `path`, or defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<(Self, ConfigSource)> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults(path.to_path_buf())));
        }
        let config = Self::load_from(path)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load the default config file with environment variable overrides applied.
    pub fn load_with_env() -> Result<LoadedConfig> {
        Self::load_with(&config_path(), |key| std::env::var(key).ok())
    }

    /// Load `path` and apply overrides from `lookup`.
    pub fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig> {
        let (mut config, source) = Self::load_or_default(path)?;
        let ignored_overrides = config.apply_overrides_from(lookup);
        Ok(LoadedConfig {
            config,
            source,
            ignored_overrides,
        })
    }

    /// Apply overrides from an arbitrary lookup (used by tests to avoid touching the process env).
    ///
    /// Returns a notice for each override that was present but unusable.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut ignored = Vec::new();
        if let Some(bind) = lookup("PROFILES_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Some(port) = lookup("PROFILES_PORT") {
            match port.parse() {
                Ok(p) => self.network.port = p,
                Err(_) => ignored.push(format!("Ignoring invalid PROFILES_PORT '{port}'")),
            }
        }
        if let Some(secret) = lookup("PROFILES_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(path) = lookup("PROFILES_DB_PATH") {
            self.storage.db_path = Some(path);
        }
        if let Some(level) = lookup("PROFILES_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(endpoint) = lookup("PROFILES_TRANSLATE_URL") {
            self.translation.endpoint = endpoint;
        }
        if let Some(key) = lookup("PROFILES_TRANSLATE_API_KEY") {
            self.translation.api_key = Some(key);
        }
        if let Some(path) = lookup("PROFILES_LEXICON_PATH") {
            self.sentiment.lexicon_path = Some(path);
        }
        ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tracing_subscriber::util::SubscriberInitExt;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network.port, 8000);
        assert_eq!(config.network.bind, "127.0.0.1");
        assert_eq!(config.translation.detector, "remote");
        assert_eq!(config.translation.max_retries, 2);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.sentiment.lexicon_path.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "network": { "port": 9100 }, "observability": { "level": "debug" } }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.network.port, 9100);
        assert_eq!(config.network.bind, "127.0.0.1");
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.auth.token_expiry_secs, 86400);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PROFILES_PORT", "9200"),
            ("PROFILES_JWT_SECRET", "from-env"),
            ("PROFILES_TRANSLATE_URL", "http://translate.internal"),
            ("PROFILES_LEXICON_PATH", "/srv/vader_lexicon.txt"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.network.port, 9200);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-env"));
        assert_eq!(config.translation.endpoint, "http://translate.internal");
        assert_eq!(
            config.sentiment.lexicon_path.as_deref(),
            Some("/srv/vader_lexicon.txt")
        );
    }

    #[test]
    fn test_invalid_port_override_ignored() {
        let mut config = Config::default();
        let ignored =
            config.apply_overrides_from(|key| (key == "PROFILES_PORT").then(|| "not-a-port".into()));
        assert_eq!(config.network.port, 8000);
        assert_eq!(ignored, vec!["Ignoring invalid PROFILES_PORT 'not-a-port'".to_string()]);
    }

    #[test]
    fn test_load_with_reports_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let loaded = Config::load_with(&path, |_| None).unwrap();
        assert_eq!(loaded.source, ConfigSource::Defaults(path.clone()));
        assert!(loaded.ignored_overrides.is_empty());

        fs::write(&path, r#"{ "network": { "port": 9100 } }"#).unwrap();
        let loaded = Config::load_with(&path, |_| None).unwrap();
        assert_eq!(loaded.source, ConfigSource::File(path));
        assert_eq!(loaded.config.network.port, 9100);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_load_notices_are_logged_after_subscriber_install() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_with(&dir.path().join("config.json"), |key| {
            (key == "PROFILES_PORT").then(|| "eighty".into())
        })
        .unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        {
            let _guard = subscriber.set_default();
            loaded.log_summary();
        }

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Config file not found, using defaults"));
        assert!(output.contains("Ignoring invalid PROFILES_PORT 'eighty'"));
    }

    #[test]
    fn test_resolved_db_path() {
        let storage = StorageConfig {
            db_path: Some("/tmp/custom.db".into()),
        };
        assert_eq!(storage.resolved_db_path(), PathBuf::from("/tmp/custom.db"));

        let storage = StorageConfig::default();
        assert!(storage.resolved_db_path().ends_with("profiles.db"));
    }
}
