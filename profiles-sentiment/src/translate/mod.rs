//! Machine translation backends.
//!
//! [`LibreTranslateClient`] talks to a LibreTranslate-compatible HTTP API and
//! also serves as a remote [`crate::LanguageDetector`]. [`RetryingTranslator`]
//! wraps any backend with exponential-backoff retries for transient failures.

mod libre;
mod retry;

pub use libre::LibreTranslateClient;
pub use retry::{RetryPolicy, RetryingDetector, RetryingTranslator};

use crate::error::UpstreamError;
use async_trait::async_trait;

/// Translates text between languages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Translate `text` from `source` into `target` (ISO 639-1 codes).
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, UpstreamError>;
}
