//! Language detection.

use crate::error::UpstreamError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Identifies the language of a piece of text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    /// Detector name for logs.
    fn name(&self) -> &str;

    /// Return a lower-case ISO 639-1 code such as `"en"` or `"es"`.
    async fn detect(&self, text: &str) -> Result<String, UpstreamError>;
}

/// Texts shorter than this (in chars) are never trusted to trigram statistics.
const MIN_RELIABLE_CHARS: usize = 20;

/// Offline detector backed by trigram statistics.
///
/// Guesses whatlang marks unreliable, and very short texts, are handed to the
/// fallback detector when one is set. Without a fallback the best guess is
/// returned.
#[derive(Clone, Default)]
pub struct WhatlangDetector {
    fallback: Option<Arc<dyn LanguageDetector>>,
}

impl WhatlangDetector {
    pub fn new() -> Self {
        Self { fallback: None }
    }

    /// Consult `fallback` whenever the local guess is not reliable.
    pub fn with_fallback(fallback: Arc<dyn LanguageDetector>) -> Self {
        Self {
            fallback: Some(fallback),
        }
    }
}

impl fmt::Debug for WhatlangDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatlangDetector")
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[async_trait]
impl LanguageDetector for WhatlangDetector {
    fn name(&self) -> &str {
        "whatlang"
    }

    async fn detect(&self, text: &str) -> Result<String, UpstreamError> {
        let info = whatlang::detect(text);
        let trusted = info
            .as_ref()
            .is_some_and(|i| i.is_reliable() && text.chars().count() >= MIN_RELIABLE_CHARS);

        if !trusted {
            if let Some(fallback) = &self.fallback {
                tracing::debug!(
                    guess = info.as_ref().map(|i| i.lang().code()),
                    "Local detection not reliable, using fallback"
                );
                return fallback.detect(text).await;
            }
        }

        let info =
            info.ok_or_else(|| UpstreamError::Detection("no language identified".into()))?;
        let code = iso_639_1(info.lang().code()).ok_or_else(|| {
            UpstreamError::Detection(format!("unsupported language '{}'", info.lang().code()))
        })?;

        tracing::debug!(
            language = code,
            confidence = info.confidence(),
            reliable = info.is_reliable(),
            "Detected language"
        );
        Ok(code.to_string())
    }
}

/// Two-letter code for a whatlang ISO 639-3 code.
///
/// Covers every language whatlang can report.
fn iso_639_1(code: &str) -> Option<&'static str> {
    let two = match code {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "nb",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        _ => return None,
    };
    Some(two)
}
