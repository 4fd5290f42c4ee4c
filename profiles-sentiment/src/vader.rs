//! Rule-based polarity scoring in the style of VADER.
//!
//! Valences come from a [`ScoringContext`]; the rules adjust them for
//! boosters, negation, ALL-CAPS emphasis, "but" contrast, "least", and
//! punctuation emphasis, then normalize the sum into a compound score in
//! `[-1, 1]`.

use crate::error::UpstreamError;
use crate::lexicon::{Lexicon, LexiconOverrides, ScoringContext};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Empirically derived increment for booster words.
const B_INCR: f64 = 0.293;
const B_DECR: f64 = -0.293;
/// Increment for an ALL-CAPS word in mixed-case text.
const C_INCR: f64 = 0.733;
/// Multiplier applied to a negated valence.
const N_SCALAR: f64 = -0.74;
/// Normalization constant approximating the maximum expected sum.
const ALPHA: f64 = 15.0;

static NEGATE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt", "ain't",
        "aren't", "can't", "couldn't", "daren't", "didn't", "doesn't", "dont", "hadnt", "hasnt",
        "havent", "isnt", "mightnt", "mustnt", "neither", "don't", "hadn't", "hasn't", "haven't",
        "isn't", "mightn't", "mustn't", "neednt", "needn't", "never", "none", "nope", "nor",
        "not", "nothing", "nowhere", "oughtnt", "shant", "shouldnt", "uhuh", "wasnt", "werent",
        "oughtn't", "shan't", "shouldn't", "uh-uh", "wasn't", "weren't", "without", "wont",
        "wouldnt", "won't", "wouldn't", "rarely", "seldom", "despite",
    ]
    .into_iter()
    .collect()
});

static BOOSTERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    let increments = [
        "absolutely", "amazingly", "awfully", "completely", "considerable", "considerably",
        "decidedly", "deeply", "effing", "enormous", "enormously", "entirely", "especially",
        "exceptional", "exceptionally", "extreme", "extremely", "fabulously", "flipping",
        "flippin", "frackin", "fracking", "fricking", "frickin", "frigging", "friggin", "fully",
        "fuckin", "fucking", "fuggin", "fugging", "greatly", "hella", "highly", "hugely",
        "incredible", "incredibly", "intensely", "major", "majorly", "more", "most",
        "particularly", "purely", "quite", "really", "remarkably", "so", "substantially",
        "thoroughly", "total", "totally", "tremendous", "tremendously", "uber", "unbelievably",
        "unusually", "utter", "utterly", "very",
    ];
    let decrements = [
        "almost", "barely", "hardly", "just enough", "kind of", "kinda", "kindof", "kind-of",
        "less", "little", "marginal", "marginally", "occasional", "occasionally", "partly",
        "scarce", "scarcely", "slight", "slightly", "somewhat", "sort of", "sorta", "sortof",
        "sort-of",
    ];
    increments
        .into_iter()
        .map(|w| (w, B_INCR))
        .chain(decrements.into_iter().map(|w| (w, B_DECR)))
        .collect()
});

static SPECIAL_CASES: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("the shit", 3.0),
        ("the bomb", 3.0),
        ("bad ass", 1.5),
        ("badass", 1.5),
        ("bus stop", 0.0),
        ("yeah right", -2.0),
        ("kiss of death", -1.5),
        ("to die for", 3.0),
        ("beating heart", 3.1),
        ("broken heart", -2.9),
    ]
    .into_iter()
    .collect()
});

/// Polarity proportions and the normalized compound score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarityScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

/// A lexicon-based polarity scorer.
#[cfg_attr(test, mockall::automock)]
pub trait PolarityScorer: Send + Sync {
    /// Scorer name for logs.
    fn name(&self) -> &str;

    /// Score `text` with `overrides` merged over the scorer's base lexicon.
    fn polarity_scores(
        &self,
        text: &str,
        overrides: &LexiconOverrides,
    ) -> Result<PolarityScores, UpstreamError>;
}

/// VADER rule set over a shared, read-only base lexicon.
#[derive(Debug, Clone)]
pub struct VaderScorer {
    lexicon: Arc<Lexicon>,
}

impl VaderScorer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Scorer over the built-in compact lexicon.
    pub fn builtin() -> Self {
        Self::new(Lexicon::builtin())
    }

    /// Score with an explicit context.
    pub fn score_with(&self, ctx: &ScoringContext<'_>, text: &str) -> PolarityScores {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return PolarityScores::default();
        }

        let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let cap_diff = allcap_differential(&tokens);

        let mut sentiments = Vec::with_capacity(tokens.len());
        for (i, lower) in lowered.iter().enumerate() {
            let lower = lower.as_str();
            if BOOSTERS.contains_key(lower)
                || (lower == "kind" && lowered.get(i + 1).map(String::as_str) == Some("of"))
            {
                sentiments.push(0.0);
                continue;
            }
            sentiments.push(self.sentiment_valence(ctx, &tokens, &lowered, i, cap_diff));
        }

        but_check(&lowered, &mut sentiments);
        score_valence(&sentiments, text)
    }

    fn sentiment_valence(
        &self,
        ctx: &ScoringContext<'_>,
        tokens: &[String],
        lowered: &[String],
        i: usize,
        cap_diff: bool,
    ) -> f64 {
        let lower = lowered[i].as_str();
        let Some(base) = ctx.valence(lower) else {
            return 0.0;
        };
        let mut valence = base;

        // "no" directly before another sentiment word acts as a negator, not a sentiment.
        if lower == "no" && lowered.get(i + 1).is_some_and(|next| ctx.contains(next)) {
            valence = 0.0;
        }
        if (i > 0 && lowered[i - 1] == "no")
            || (i > 1 && lowered[i - 2] == "no")
            || (i > 2 && lowered[i - 3] == "no" && matches!(lowered[i - 1].as_str(), "or" | "nor"))
        {
            valence = base * N_SCALAR;
        }

        if is_upper(&tokens[i]) && cap_diff {
            valence += if valence > 0.0 { C_INCR } else { -C_INCR };
        }

        for start_i in 0..3 {
            if i <= start_i {
                break;
            }
            let prev = i - (start_i + 1);
            if ctx.contains(&lowered[prev]) {
                continue;
            }

            let mut scalar =
                scalar_inc_dec(&lowered[prev], is_upper(&tokens[prev]), valence, cap_diff);
            if start_i == 1 {
                scalar *= 0.95;
            } else if start_i == 2 {
                scalar *= 0.9;
            }
            valence += scalar;
            valence = negation_check(valence, lowered, start_i, i);
            if start_i == 2 {
                valence = special_idioms_check(valence, lowered, i);
            }
        }

        least_check(ctx, valence, lowered, i)
    }
}

impl PolarityScorer for VaderScorer {
    fn name(&self) -> &str {
        "vader"
    }

    fn polarity_scores(
        &self,
        text: &str,
        overrides: &LexiconOverrides,
    ) -> Result<PolarityScores, UpstreamError> {
        let ctx = ScoringContext::new(&self.lexicon, overrides);
        Ok(self.score_with(&ctx, text))
    }
}

/// Whitespace tokens with surrounding punctuation removed, unless that leaves
/// two characters or fewer (keeps emoticons such as `:)` intact).
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| {
            let stripped = token.trim_matches(|c: char| c.is_ascii_punctuation());
            if stripped.chars().count() <= 2 {
                token.to_string()
            } else {
                stripped.to_string()
            }
        })
        .collect()
}

/// True for tokens with at least one cased letter and no lowercase letters.
fn is_upper(token: &str) -> bool {
    token.chars().any(char::is_uppercase) && !token.chars().any(char::is_lowercase)
}

/// Some, but not all, tokens are ALL CAPS.
fn allcap_differential(tokens: &[String]) -> bool {
    let allcaps = tokens.iter().filter(|t| is_upper(t)).count();
    allcaps > 0 && allcaps < tokens.len()
}

fn scalar_inc_dec(word_lower: &str, word_upper: bool, valence: f64, cap_diff: bool) -> f64 {
    let Some(&boost) = BOOSTERS.get(word_lower) else {
        return 0.0;
    };
    let mut scalar = if valence < 0.0 { -boost } else { boost };
    if word_upper && cap_diff {
        scalar += if valence > 0.0 { C_INCR } else { -C_INCR };
    }
    scalar
}

fn negated(word: &str) -> bool {
    NEGATE.contains(word) || word.contains("n't")
}

fn negation_check(valence: f64, lowered: &[String], start_i: usize, i: usize) -> f64 {
    let w = |offset: usize| lowered[i - offset].as_str();
    match start_i {
        0 => {
            if negated(w(1)) {
                return valence * N_SCALAR;
            }
        }
        1 => {
            if w(2) == "never" && matches!(w(1), "so" | "this") {
                return valence * 1.25;
            } else if w(2) == "without" && w(1) == "doubt" {
                return valence;
            } else if negated(w(2)) {
                return valence * N_SCALAR;
            }
        }
        _ => {
            // "so"/"this" right before the word intensifies it with or
            // without a leading "never".
            if (w(3) == "never" && matches!(w(2), "so" | "this"))
                || matches!(w(1), "so" | "this")
            {
                return valence * 1.25;
            } else if w(3) == "without" && (w(2) == "doubt" || w(1) == "doubt") {
                return valence;
            } else if negated(w(3)) {
                return valence * N_SCALAR;
            }
        }
    }
    valence
}

fn special_idioms_check(mut valence: f64, lowered: &[String], i: usize) -> f64 {
    let w = |idx: usize| lowered[idx].as_str();
    let onezero = format!("{} {}", w(i - 1), w(i));
    let twoonezero = format!("{} {} {}", w(i - 2), w(i - 1), w(i));
    let twoone = format!("{} {}", w(i - 2), w(i - 1));
    let threetwoone = format!("{} {} {}", w(i - 3), w(i - 2), w(i - 1));
    let threetwo = format!("{} {}", w(i - 3), w(i - 2));

    for seq in [&onezero, &twoonezero, &twoone, &threetwoone, &threetwo] {
        if let Some(&v) = SPECIAL_CASES.get(seq.as_str()) {
            valence = v;
            break;
        }
    }

    if lowered.len() > i + 1 {
        let zeroone = format!("{} {}", w(i), w(i + 1));
        if let Some(&v) = SPECIAL_CASES.get(zeroone.as_str()) {
            valence = v;
        }
    }
    if lowered.len() > i + 2 {
        let zeroonetwo = format!("{} {} {}", w(i), w(i + 1), w(i + 2));
        if let Some(&v) = SPECIAL_CASES.get(zeroonetwo.as_str()) {
            valence = v;
        }
    }

    for ngram in [&threetwoone, &threetwo, &twoone] {
        if let Some(&boost) = BOOSTERS.get(ngram.as_str()) {
            valence += boost;
        }
    }
    valence
}

fn least_check(ctx: &ScoringContext<'_>, valence: f64, lowered: &[String], i: usize) -> f64 {
    if i > 1 && !ctx.contains(&lowered[i - 1]) && lowered[i - 1] == "least" {
        if lowered[i - 2] != "at" && lowered[i - 2] != "very" {
            return valence * N_SCALAR;
        }
    } else if i > 0 && !ctx.contains(&lowered[i - 1]) && lowered[i - 1] == "least" {
        return valence * N_SCALAR;
    }
    valence
}

/// Sentiment before the first "but" is dampened, after it amplified.
fn but_check(lowered: &[String], sentiments: &mut [f64]) {
    let Some(bi) = lowered.iter().position(|w| w == "but") else {
        return;
    };
    for (si, s) in sentiments.iter_mut().enumerate() {
        if si < bi {
            *s *= 0.5;
        } else if si > bi {
            *s *= 1.5;
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let ep_count = text.matches('!').count().min(4) as f64;
    let ep_amplifier = ep_count * 0.292;

    let qm_count = text.matches('?').count();
    let qm_amplifier = match qm_count {
        0 | 1 => 0.0,
        2 | 3 => qm_count as f64 * 0.18,
        _ => 0.96,
    };

    ep_amplifier + qm_amplifier
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

/// Round to `places` decimals using the exact binary value, so 0.1235
/// (stored as 0.12349999...) rounds down to 0.123.
pub(crate) fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}

fn score_valence(sentiments: &[f64], text: &str) -> PolarityScores {
    if sentiments.is_empty() {
        return PolarityScores::default();
    }

    let punct = punctuation_emphasis(text);
    let mut sum: f64 = sentiments.iter().sum();
    if sum > 0.0 {
        sum += punct;
    } else if sum < 0.0 {
        sum -= punct;
    }
    let compound = normalize(sum);

    let mut pos_sum = 0.0;
    let mut neg_sum = 0.0;
    let mut neu_count = 0.0;
    for &s in sentiments {
        if s > 0.0 {
            pos_sum += s + 1.0;
        } else if s < 0.0 {
            neg_sum += s - 1.0;
        } else {
            neu_count += 1.0;
        }
    }

    if pos_sum > neg_sum.abs() {
        pos_sum += punct;
    } else if pos_sum < neg_sum.abs() {
        neg_sum -= punct;
    }

    let total = pos_sum + neg_sum.abs() + neu_count;
    if total == 0.0 {
        return PolarityScores {
            compound: round_to(compound, 4),
            ..PolarityScores::default()
        };
    }

    PolarityScores {
        neg: round_to((neg_sum / total).abs(), 3),
        neu: round_to((neu_count / total).abs(), 3),
        pos: round_to((pos_sum / total).abs(), 3),
        compound: round_to(compound, 4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn compound(text: &str) -> f64 {
        VaderScorer::builtin()
            .polarity_scores(text, &LexiconOverrides::default())
            .unwrap()
            .compound
    }

    fn compound_with_overrides(text: &str) -> f64 {
        VaderScorer::builtin()
            .polarity_scores(text, &LexiconOverrides::sentiment_defaults())
            .unwrap()
            .compound
    }

    #[test_case("good", 0.4404 ; "single positive word")]
    #[test_case("not good", -0.3412 ; "negation flips and dampens")]
    #[test_case("very good", 0.4927 ; "booster increments")]
    #[test_case("GOOD day", 0.5622 ; "caps emphasis in mixed case")]
    #[test_case("good!!!", 0.5826 ; "exclamation emphasis")]
    #[test_case("good but bad", -0.5859 ; "but shifts weight to second clause")]
    #[test_case("the food was so good", 0.5777 ; "so intensifies the next word")]
    #[test_case("the food is this good", 0.5228 ; "this intensifies the next word")]
    fn test_known_compound_scores(text: &str, expected: f64) {
        assert!(
            (compound(text) - expected).abs() < 1e-4,
            "{text}: got {}, want {expected}",
            compound(text)
        );
    }

    #[test_case(0.1235, 3, 0.123 ; "binary value just below the half")]
    #[test_case(0.1005, 3, 0.101 ; "binary value just above the half")]
    #[test_case(0.57772, 4, 0.5777 ; "four places")]
    #[test_case(-0.34125, 4, -0.3412 ; "negative below the half")]
    fn test_round_to(value: f64, places: usize, expected: f64) {
        assert_eq!(round_to(value, places), expected);
    }

    #[test]
    fn test_empty_and_neutral_text() {
        assert_eq!(compound(""), 0.0);
        assert_eq!(compound("   "), 0.0);
        assert_eq!(compound("the table is in the kitchen"), 0.0);
    }

    #[test]
    fn test_overrides_make_dont_like_negative() {
        // "don't" (-2) is a lexicon word after the merge, so it no longer negates "like" (+1).
        assert_eq!(compound_with_overrides("I don't like this"), -0.25);
    }

    #[test]
    fn test_without_overrides_dont_negates_like() {
        // Base "like" is 2.0, negated by "don't": 2.0 * -0.74.
        let score = compound("I don't like this");
        assert!((score - -0.357).abs() < 1e-4, "got {score}");
    }

    #[test]
    fn test_multi_word_overrides_do_not_match_tokens() {
        let with = compound_with_overrides("we did not go");
        let without = compound("we did not go");
        assert_eq!(with, without);
        assert_eq!(with, 0.0);
    }

    #[test]
    fn test_no_before_sentiment_word() {
        // "no" is neutralized and the following word is negated.
        let score = compound("no problems");
        assert!(score > 0.0, "got {score}");
    }

    #[test]
    fn test_least_negates() {
        assert!(compound("the least good") < 0.0);
        assert!(compound("at least good") > 0.0);
    }

    #[test]
    fn test_booster_alone_is_neutral() {
        assert_eq!(compound("very"), 0.0);
        assert_eq!(compound("kind of"), 0.0);
    }

    #[test]
    fn test_proportions_sum_to_one() {
        let scores = VaderScorer::builtin()
            .polarity_scores("good but bad things happen", &LexiconOverrides::default())
            .unwrap();
        let total = scores.neg + scores.neu + scores.pos;
        assert!((total - 1.0).abs() < 0.01, "got {total}");
        assert!(scores.neg > scores.pos);
    }

    #[test]
    fn test_tokenize_keeps_short_emoticons() {
        assert_eq!(tokenize("great :) !"), vec!["great", ":)", "!"]);
        assert_eq!(tokenize("\"wonderful,\" she said."), vec!["wonderful", "she", "said"]);
    }

    #[test]
    fn test_custom_lexicon() {
        let lexicon: Lexicon = [("sunny".to_string(), 2.0)].into_iter().collect();
        let scorer = VaderScorer::new(Arc::new(lexicon));
        let scores = scorer
            .polarity_scores("sunny weather", &LexiconOverrides::default())
            .unwrap();
        assert!(scores.compound > 0.0);
        assert_eq!(scorer.name(), "vader");
    }
}
