//! Message analysis: detect → translate → score → classify.

use crate::error::{AnalysisError, LexiconError};
use crate::language::{LanguageDetector, WhatlangDetector};
use crate::lexicon::{Lexicon, LexiconOverrides};
use crate::translate::{
    LibreTranslateClient, RetryPolicy, RetryingDetector, RetryingTranslator, Translator,
};
use crate::vader::{round_to, PolarityScorer, VaderScorer};
use profiles_common::util::{char_len, truncate_with_ellipsis};
use profiles_common::config::default_lexicon_path;
use profiles_common::Config;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Scores above this are positive, below its negation negative.
pub const POLARITY_THRESHOLD: f64 = 0.10;

const SPANISH: &str = "es";
const ENGLISH: &str = "en";

/// Categorical sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentTag {
    Positive,
    Neutral,
    Negative,
}

impl SentimentTag {
    /// Strict thresholds; a score of exactly ±0.10 is neutral.
    pub fn from_score(score: f64) -> Self {
        if score < -POLARITY_THRESHOLD {
            Self::Negative
        } else if score > POLARITY_THRESHOLD {
            Self::Positive
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }
}

impl fmt::Display for SentimentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of analyzing one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Upper-cased ISO 639-1 code, e.g. "EN".
    pub original_language: String,
    pub translation_spanish: String,
    pub translation_english: String,
    /// Compound polarity of the English text, rounded to 3 decimals.
    pub sentiment_score: f64,
    pub sentiment_tag: SentimentTag,
}

/// Runs the analysis pipeline over shared, read-only collaborators.
#[derive(Clone)]
pub struct TextAnalyzer {
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
    scorer: Arc<dyn PolarityScorer>,
    overrides: Arc<LexiconOverrides>,
}

impl TextAnalyzer {
    /// Build an analyzer using the fixed sentiment overrides.
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn Translator>,
        scorer: Arc<dyn PolarityScorer>,
    ) -> Self {
        Self {
            detector,
            translator,
            scorer,
            overrides: Arc::new(LexiconOverrides::sentiment_defaults()),
        }
    }

    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &Config) -> profiles_common::Result<Self> {
        let translation = &config.translation;
        let policy = RetryPolicy::from_config(translation);
        let client = Arc::new(
            LibreTranslateClient::from_config(translation)
                .map_err(|e| profiles_common::Error::Config(e.to_string()))?,
        );

        let translator: Arc<dyn Translator> =
            Arc::new(RetryingTranslator::new(client.clone(), policy.clone()));

        let remote: Arc<dyn LanguageDetector> = Arc::new(RetryingDetector::new(client, policy));
        let detector: Arc<dyn LanguageDetector> =
            match translation.detector.to_lowercase().as_str() {
                "local" => Arc::new(WhatlangDetector::with_fallback(remote)),
                _ => remote,
            };

        let lexicon = Lexicon::resolve(
            config.sentiment.lexicon_path.as_deref().map(Path::new),
            &default_lexicon_path(),
        )
        .map_err(|e: LexiconError| profiles_common::Error::Config(e.to_string()))?;
        let scorer: Arc<dyn PolarityScorer> = Arc::new(VaderScorer::new(lexicon));

        tracing::info!(
            detector = detector.name(),
            translator = translator.name(),
            scorer = scorer.name(),
            endpoint = %translation.endpoint,
            "Text analyzer configured"
        );

        Ok(Self::new(detector, translator, scorer))
    }

    /// Analyze a message.
    ///
    /// Fails with [`AnalysisError::InvalidInput`] when the message is absent
    /// or empty, before any collaborator is called.
    pub async fn analyze(&self, message: Option<&str>) -> Result<AnalysisResult, AnalysisError> {
        let text = match message {
            Some(text) if !text.is_empty() => text,
            _ => return Err(AnalysisError::InvalidInput),
        };

        let language = self.detector.detect(text).await?;

        let translation_spanish = if language == SPANISH {
            text.to_string()
        } else {
            self.translator.translate(text, &language, SPANISH).await?
        };

        let translation_english = if language == ENGLISH {
            text.to_string()
        } else {
            self.translator.translate(text, &language, ENGLISH).await?
        };

        let scores = self
            .scorer
            .polarity_scores(&translation_english, &self.overrides)?;
        let sentiment_score = round_to(scores.compound, 3);
        let sentiment_tag = SentimentTag::from_score(sentiment_score);

        tracing::info!(
            language = %language,
            chars = char_len(text),
            score = sentiment_score,
            tag = %sentiment_tag,
            "Message analyzed"
        );
        tracing::debug!(preview = %truncate_with_ellipsis(text, 40), "Analyzed message preview");

        Ok(AnalysisResult {
            original_language: language.to_uppercase(),
            translation_spanish,
            translation_english,
            sentiment_score,
            sentiment_tag,
        })
    }
}

impl fmt::Debug for TextAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextAnalyzer")
            .field("overrides", &self.overrides.len())
            .finish_non_exhaustive()
    }
}
