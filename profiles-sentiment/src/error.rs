//! Error types for message analysis.

use thiserror::Error;

/// Failure reported by a language-detection, translation, or scoring collaborator.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The request never produced an HTTP response (connect, DNS, timeout).
    #[error("{service}: request failed: {message}")]
    Transport { service: String, message: String },

    /// The service answered with a non-success status.
    #[error("{service}: HTTP {status}: {message}")]
    Status {
        service: String,
        status: u16,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("{service}: malformed response: {message}")]
    Decode { service: String, message: String },

    /// The language of the text could not be determined.
    #[error("language detection failed: {0}")]
    Detection(String),

    /// The polarity scorer rejected the text.
    #[error("sentiment scoring failed: {0}")]
    Scoring(String),
}

impl UpstreamError {
    /// Whether repeating the same call may succeed.
    ///
    /// Transport failures, throttling and server errors are transient;
    /// client errors and malformed payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Error returned by [`crate::TextAnalyzer::analyze`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The message was absent or empty; no collaborator was called.
    #[error("Message not found")]
    InvalidInput,

    /// A collaborator failed and the failure was not recovered.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl From<AnalysisError> for profiles_common::Error {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidInput => Self::InvalidInput("Message not found".into()),
            AnalysisError::Upstream(e) => Self::External(e.to_string()),
        }
    }
}

/// Error loading a sentiment lexicon.
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid lexicon entry on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("lexicon contains no entries")]
    Empty,
}
