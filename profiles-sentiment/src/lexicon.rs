//! Sentiment lexicons and per-call scoring contexts.
//!
//! A [`Lexicon`] maps tokens to a mean valence. It is loaded once and shared
//! read-only. The fixed [`LexiconOverrides`] are layered on top of it through a
//! [`ScoringContext`] built for every scoring call, so the base lexicon is
//! never mutated and concurrent requests cannot observe each other's state.

use crate::error::LexiconError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Compact built-in lexicon (VADER text format).
const BUILTIN_LEXICON: &str = include_str!("../resources/lexicon.txt");

static BUILTIN: Lazy<Arc<Lexicon>> = Lazy::new(|| {
    // The embedded resource is covered by tests; an empty fallback keeps startup infallible.
    Arc::new(Lexicon::parse(BUILTIN_LEXICON).unwrap_or_default())
});

/// Phrase weights applied on top of the base lexicon for message analysis.
pub const SENTIMENT_OVERRIDES: &[(&str, f64)] = &[
    ("dont", -2.0),
    ("don't", -2.0),
    ("do not", -2.0),
    ("don't like", -3.0),
    ("did not", -3.0),
    ("didn't", -3.0),
    ("like", 1.0),
];

/// Token → mean valence table.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: HashMap<String, f64>,
}

impl Lexicon {
    /// Parse a lexicon in the VADER text format.
    ///
    /// One entry per line: token, a tab, the mean valence, then optional
    /// columns that are ignored. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, LexiconError> {
        let mut entries = HashMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let mut columns = line.split('\t');
            let token = columns.next().unwrap_or_default().trim();
            if token.is_empty() {
                return Err(LexiconError::Parse {
                    line: idx + 1,
                    reason: "missing token".into(),
                });
            }

            let mean = columns
                .next()
                .ok_or_else(|| LexiconError::Parse {
                    line: idx + 1,
                    reason: format!("missing valence for '{token}'"),
                })?
                .trim()
                .parse::<f64>()
                .map_err(|e| LexiconError::Parse {
                    line: idx + 1,
                    reason: format!("invalid valence for '{token}': {e}"),
                })?;

            entries.insert(token.to_string(), mean);
        }

        if entries.is_empty() {
            return Err(LexiconError::Empty);
        }

        Ok(Self { entries })
    }

    /// Load a lexicon file from disk.
    pub fn from_path(path: &Path) -> Result<Self, LexiconError> {
        let text = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let lexicon = Self::parse(&text)?;
        tracing::info!(
            path = %path.display(),
            entries = lexicon.len(),
            "Loaded sentiment lexicon"
        );
        Ok(lexicon)
    }

    /// The compact lexicon shipped with the crate.
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Pick the lexicon to score with.
    ///
    /// An explicit `path` must load. Otherwise `fallback_path` is used when the
    /// file exists, and the compact built-in lexicon when it does not.
    pub fn resolve(path: Option<&Path>, fallback_path: &Path) -> Result<Arc<Self>, LexiconError> {
        if let Some(path) = path {
            return Self::from_path(path).map(Arc::new);
        }
        if fallback_path.exists() {
            return Self::from_path(fallback_path).map(Arc::new);
        }

        let builtin = Self::builtin();
        tracing::warn!(
            entries = builtin.len(),
            expected_at = %fallback_path.display(),
            "Full VADER lexicon not found, scoring with the compact built-in lexicon"
        );
        Ok(builtin)
    }

    /// Look up a token exactly as stored.
    pub fn get(&self, token: &str) -> Option<f64> {
        self.entries.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, f64)> for Lexicon {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Read-only phrase weights that take precedence over the base lexicon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexiconOverrides {
    entries: HashMap<String, f64>,
}

impl LexiconOverrides {
    /// The fixed override set used by message analysis.
    pub fn sentiment_defaults() -> Self {
        Self::from_pairs(SENTIMENT_OVERRIDES.iter().copied())
    }

    /// Build overrides from `(phrase, weight)` pairs; later pairs win.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(phrase, weight)| (phrase.to_string(), weight))
                .collect(),
        }
    }

    pub fn get(&self, phrase: &str) -> Option<f64> {
        self.entries.get(phrase).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merged view of a base lexicon and an override set for a single scoring call.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    base: &'a Lexicon,
    overrides: &'a LexiconOverrides,
}

impl<'a> ScoringContext<'a> {
    pub fn new(base: &'a Lexicon, overrides: &'a LexiconOverrides) -> Self {
        Self { base, overrides }
    }

    /// Valence for an already lower-cased token; overrides win over the base lexicon.
    pub fn valence(&self, token: &str) -> Option<f64> {
        self.overrides.get(token).or_else(|| self.base.get(token))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.valence(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lexicon_loads() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.len() > 200);
        assert_eq!(lexicon.get("good"), Some(1.9));
        assert_eq!(lexicon.get("like"), Some(2.0));
        assert_eq!(lexicon.get("bad"), Some(-2.5));
        assert_eq!(lexicon.get("no"), Some(-1.2));
    }

    #[test]
    fn test_resolve_prefers_file_in_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("vader_lexicon.txt");
        std::fs::write(&fallback, "zestful\t2.1\t0.7\t[2, 2, 3]\ngood\t1.9\n").unwrap();

        let lexicon = Lexicon::resolve(None, &fallback).unwrap();
        assert_eq!(lexicon.len(), 2);
        assert_eq!(lexicon.get("zestful"), Some(2.1));
    }

    #[test]
    fn test_resolve_without_any_file_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let lexicon = Lexicon::resolve(None, &dir.path().join("vader_lexicon.txt")).unwrap();
        assert!(Arc::ptr_eq(&lexicon, &Lexicon::builtin()));
    }

    #[test]
    fn test_resolve_explicit_path_must_load() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("vader_lexicon.txt");
        std::fs::write(&fallback, "good\t1.9\n").unwrap();

        let err = Lexicon::resolve(Some(&dir.path().join("missing.txt")), &fallback).unwrap_err();
        assert!(matches!(err, LexiconError::Io { .. }));
    }

    #[test]
    fn test_builtin_excludes_function_words() {
        let lexicon = Lexicon::builtin();
        for word in ["i", "this", "not", "very", "but", "do", "did"] {
            assert!(lexicon.get(word).is_none(), "{word} should not carry valence");
        }
    }

    #[test]
    fn test_parse_ignores_extra_columns_and_comments() {
        let text = "# header\n\nhappy\t2.7\t0.78\t[3, 2, 3]\n:)\t2.0\n";
        let lexicon = Lexicon::parse(text).unwrap();
        assert_eq!(lexicon.len(), 2);
        assert_eq!(lexicon.get("happy"), Some(2.7));
        assert_eq!(lexicon.get(":)"), Some(2.0));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = Lexicon::parse("good\t1.9\nbad\tterrible\n").unwrap_err();
        assert!(matches!(err, LexiconError::Parse { line: 2, .. }));

        let err = Lexicon::parse("good\t1.9\nlonely\n").unwrap_err();
        assert!(matches!(err, LexiconError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_parse_empty_is_error() {
        assert!(matches!(
            Lexicon::parse("# nothing here\n"),
            Err(LexiconError::Empty)
        ));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = Lexicon::from_path(Path::new("/nonexistent/vader_lexicon.txt")).unwrap_err();
        assert!(matches!(err, LexiconError::Io { .. }));
    }

    #[test]
    fn test_sentiment_defaults() {
        let overrides = LexiconOverrides::sentiment_defaults();
        assert_eq!(overrides.len(), 7);
        assert_eq!(overrides.get("don't"), Some(-2.0));
        assert_eq!(overrides.get("don't like"), Some(-3.0));
        assert_eq!(overrides.get("didn't"), Some(-3.0));
        assert_eq!(overrides.get("like"), Some(1.0));
    }

    #[test]
    fn test_context_prefers_overrides() {
        let base: Lexicon = [("like".to_string(), 2.0), ("good".to_string(), 1.9)]
            .into_iter()
            .collect();
        let overrides = LexiconOverrides::sentiment_defaults();
        let ctx = ScoringContext::new(&base, &overrides);

        assert_eq!(ctx.valence("like"), Some(1.0));
        assert_eq!(ctx.valence("good"), Some(1.9));
        assert_eq!(ctx.valence("dont"), Some(-2.0));
        assert!(!ctx.contains("table"));

        // The base lexicon is untouched by the merge.
        assert_eq!(base.get("like"), Some(2.0));
        assert!(base.get("dont").is_none());
    }
}
