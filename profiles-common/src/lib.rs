//! Profiles Common - Shared configuration, errors, and logging for the profiles API.
//!
//! This crate provides:
//! - Configuration types, loading, and environment overrides
//! - Configuration validation
//! - The service-wide error type
//! - Logging setup and request tracing helpers
//! - Small string utilities

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    AuthConfig, Config, ConfigSource, LoadedConfig, NetworkConfig, ObservabilityConfig,
    SentimentConfig, StorageConfig, TranslationConfig,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};
