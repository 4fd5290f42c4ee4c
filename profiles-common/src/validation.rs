//! Configuration validation.
//!
//! Each section validates itself; `Config::validate` collects every failure
//! so an operator sees all problems at once.

use thiserror::Error;

use crate::config::{Config, NetworkConfig, ObservabilityConfig, TranslationConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.network.validate() {
            errors.push(e);
        }
        if let Err(e) = self.translation.validate() {
            errors.push(e);
        }
        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }
        if self.auth.token_expiry_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "auth.token_expiry_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if matches!(self.auth.jwt_secret.as_deref(), Some("")) {
            errors.push(ValidationError::MissingField {
                field: "auth.jwt_secret".into(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Validate for NetworkConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "network.port".into(),
            });
        }

        if self.bind.parse::<std::net::IpAddr>().is_err() {
            return Err(ValidationError::InvalidValue {
                field: "network.bind".into(),
                reason: format!("not an IP address: {}", self.bind),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "network.request_timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

impl Validate for TranslationConfig {
    fn validate(&self) -> ValidationResult<()> {
        match url::Url::parse(&self.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ValidationError::InvalidValue {
                    field: "translation.endpoint".into(),
                    reason: format!("must be an http(s) URL, got {}", self.endpoint),
                });
            }
        }

        let valid_detectors = ["local", "remote"];
        if !valid_detectors.contains(&self.detector.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "translation.detector".into(),
                reason: format!("must be one of: {}", valid_detectors.join(", ")),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "translation.timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.base_backoff_ms > self.max_backoff_ms {
            return Err(ValidationError::InvalidValue {
                field: "translation.base_backoff_ms".into(),
                reason: "must not exceed translation.max_backoff_ms".into(),
            });
        }

        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }
}
