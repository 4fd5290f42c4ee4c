//! Profiles Sentiment - Message analysis for the profiles API.
//!
//! This crate provides:
//! - A VADER-style lexicon polarity scorer with per-call lexicon overrides
//! - Language detection (local `whatlang` or the translation service)
//! - A LibreTranslate client with retrying decorators
//! - [`TextAnalyzer`], which ties them together

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod analyzer;
pub mod error;
pub mod language;
pub mod lexicon;
pub mod translate;
pub mod vader;

pub use analyzer::{AnalysisResult, SentimentTag, TextAnalyzer, POLARITY_THRESHOLD};
pub use error::{AnalysisError, LexiconError, UpstreamError};
pub use language::{LanguageDetector, WhatlangDetector};
pub use lexicon::{Lexicon, LexiconOverrides, ScoringContext, SENTIMENT_OVERRIDES};
pub use translate::{
    LibreTranslateClient, RetryPolicy, RetryingDetector, RetryingTranslator, Translator,
};
pub use vader::{PolarityScorer, PolarityScores, VaderScorer};
