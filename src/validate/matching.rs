//! Deciding whether a transcript names the expected letter.
//!
//! A transcript is normalised and compared (exact set membership, never
//! substring) against three tiers of forms:
//!
//! | tier       | example for `A`             | outcome                      |
//! |------------|-----------------------------|------------------------------|
//! | primary    | `a`, `ay`                   | exact match, score 100       |
//! | variant    | `eh`, `aye`                 | match, scaled by confidence  |
//! | confusable | `kay` (K), `aitch` (H)      | partial match, policy-driven |
//!
//! The clip's own dialect rendering (`zed` for a British Z) is primary;
//! renderings from other dialects are variants. A form that misses the
//! expected letter but names several others is ambiguous.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::accent::Accent;
use crate::alphabet::Letter;

/// How a matching transcript related to the expected letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Variant,
    Confusable,
}

/// Why a file did not validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    NoSpeechDetected,
    WrongLetter,
    TranscriptionFailed,
    Ambiguous,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoSpeechDetected => "no_speech_detected",
            Self::WrongLetter => "wrong_letter",
            Self::TranscriptionFailed => "transcription_failed",
            Self::Ambiguous => "ambiguous",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weights for matches that are not exact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Multiplier for a variant spelling of the expected letter.
    pub variant_weight: f64,
    /// Multiplier for a hit on a single confusable letter.
    pub confusable_weight: f64,
    /// Count confusable hits as matches.
    pub accept_confusables: bool,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            variant_weight: 0.9,
            confusable_weight: 0.5,
            accept_confusables: true,
        }
    }
}

/// Result of comparing one transcript with its expected letter.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub normalized_text: String,
    pub is_match: bool,
    pub kind: Option<MatchKind>,
    pub error: Option<ErrorType>,
    /// Validation score in `[0, 100]`.
    pub score: f64,
}

impl MatchOutcome {
    fn matched(normalized_text: String, kind: MatchKind, score: f64) -> Self {
        Self {
            normalized_text,
            is_match: true,
            kind: Some(kind),
            error: None,
            score: round_score(score.clamp(0.0, 100.0)),
        }
    }

    fn failed(normalized_text: String, error: ErrorType, kind: Option<MatchKind>) -> Self {
        Self {
            normalized_text,
            is_match: false,
            kind,
            error: Some(error),
            score: 0.0,
        }
    }
}

/// Lowercase, drop punctuation and collapse runs of whitespace.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Two decimals; keeps `f32` confidence noise out of reports.
fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// The letter itself and its canonical name, whitespace-free.
pub fn primary_forms(letter: Letter) -> Vec<String> {
    vec![
        letter.lowercase().to_string(),
        compact(letter.canonical_name()),
    ]
}

/// Primary forms plus the rendering `accent` speaks for `letter`.
pub fn primary_forms_for(letter: Letter, accent: Option<Accent>) -> Vec<String> {
    let mut forms = primary_forms(letter);
    if let Some(rendering) = accent.and_then(|a| a.rendering(letter)) {
        forms.push(compact(rendering));
    }
    forms
}

/// Alternative spellings plus every dialect rendering, whitespace-free.
pub fn variant_forms(letter: Letter) -> Vec<String> {
    let mut forms: Vec<String> = letter
        .variant_names()
        .iter()
        .chain(Accent::all_renderings(letter).iter())
        .map(|form| compact(form))
        .collect();
    forms.sort();
    forms.dedup();
    forms
}

fn names_letter(letter: Letter, form: &str) -> bool {
    primary_forms(letter).iter().any(|f| f == form) || variant_forms(letter).iter().any(|f| f == form)
}

/// Every letter whose primary or variant forms contain `form`.
pub fn letters_named_by(form: &str) -> Vec<Letter> {
    Letter::all().filter(|&l| names_letter(l, form)).collect()
}

/// Classify `transcript` against `expected` and score it. `accent` is the
/// dialect the clip was generated in, when known.
pub fn classify(
    expected: Letter,
    accent: Option<Accent>,
    transcript: &str,
    confidence: f32,
    policy: &ScoringPolicy,
) -> MatchOutcome {
    let normalized = normalize(transcript);
    let form = compact(&normalized);
    if form.is_empty() {
        return MatchOutcome::failed(normalized, ErrorType::NoSpeechDetected, None);
    }

    if primary_forms_for(expected, accent).contains(&form) {
        return MatchOutcome::matched(normalized, MatchKind::Exact, 100.0);
    }

    let confidence = f64::from(confidence.clamp(0.0, 1.0));
    let hits = letters_named_by(&form);

    if hits.contains(&expected) {
        let score = 100.0 * policy.variant_weight * confidence;
        return MatchOutcome::matched(normalized, MatchKind::Variant, score);
    }

    let confusable_hits = hits.iter().filter(|l| l.is_confusable_with(expected)).count();
    match (confusable_hits, hits.len()) {
        (0, _) => MatchOutcome::failed(normalized, ErrorType::WrongLetter, None),
        (1, 1) if policy.accept_confusables => {
            let score = 100.0 * policy.confusable_weight * confidence;
            MatchOutcome::matched(normalized, MatchKind::Confusable, score)
        }
        (1, 1) => MatchOutcome::failed(
            normalized,
            ErrorType::WrongLetter,
            Some(MatchKind::Confusable),
        ),
        _ => MatchOutcome::failed(normalized, ErrorType::Ambiguous, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter(c: char) -> Letter {
        Letter::new(c).unwrap()
    }

    fn classify_default(expected: char, text: &str, confidence: f32) -> MatchOutcome {
        classify(letter(expected), None, text, confidence, &ScoringPolicy::default())
    }

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("  Double-You!  "), "doubleyou");
        assert_eq!(normalize("B.  \n"), "b");
        assert_eq!(normalize("Double   you."), "double you");
    }

    #[test]
    fn every_letter_and_its_name_is_exact() {
        for l in Letter::all() {
            for text in [l.as_char().to_string(), l.canonical_name().to_string()] {
                let outcome = classify(l, None, &text, 0.2, &ScoringPolicy::default());
                assert!(outcome.is_match, "{l}: {text}");
                assert_eq!(outcome.kind, Some(MatchKind::Exact));
                assert_eq!(outcome.score, 100.0);
            }
        }
    }

    #[test]
    fn variant_scales_with_confidence() {
        let outcome = classify_default('Z', "Zed.", 0.5);
        assert!(outcome.is_match);
        assert_eq!(outcome.kind, Some(MatchKind::Variant));
        assert!((outcome.score - 45.0).abs() < 1e-9);
    }

    #[test]
    fn spaced_and_hyphenated_names_compare_equal() {
        assert_eq!(classify_default('W', "double-you", 0.9).kind, Some(MatchKind::Exact));
        assert_eq!(classify_default('W', "Double U", 0.9).kind, Some(MatchKind::Variant));
    }

    #[test]
    fn substring_is_not_a_match() {
        let outcome = classify_default('A', "a cat", 0.9);
        assert!(!outcome.is_match);
        assert_eq!(outcome.error, Some(ErrorType::WrongLetter));
    }

    #[test]
    fn empty_transcript_is_no_speech() {
        for text in ["", "   ", "..."] {
            let outcome = classify_default('Q', text, 0.9);
            assert!(!outcome.is_match);
            assert_eq!(outcome.error, Some(ErrorType::NoSpeechDetected));
            assert_eq!(outcome.score, 0.0);
        }
    }

    #[test]
    fn unrelated_word_is_wrong_letter() {
        let outcome = classify_default('A', "hey", 0.9);
        assert_eq!(outcome.error, Some(ErrorType::WrongLetter));
        assert_eq!(outcome.kind, None);
    }

    #[test]
    fn single_confusable_is_partial_match() {
        let outcome = classify_default('B', "pee", 0.8);
        assert!(outcome.is_match);
        assert_eq!(outcome.kind, Some(MatchKind::Confusable));
        assert_eq!(outcome.score, 40.0);
    }

    #[test]
    fn confusables_can_be_rejected() {
        let policy = ScoringPolicy {
            accept_confusables: false,
            ..ScoringPolicy::default()
        };
        let outcome = classify(letter('M'), None, "en", 0.9, &policy);
        assert!(!outcome.is_match);
        assert_eq!(outcome.error, Some(ErrorType::WrongLetter));
        assert_eq!(outcome.kind, Some(MatchKind::Confusable));
    }

    #[test]
    fn non_confusable_letter_is_wrong() {
        let outcome = classify_default('B', "em", 0.9);
        assert_eq!(outcome.error, Some(ErrorType::WrongLetter));
    }

    #[test]
    fn shared_form_matches_either_owner() {
        assert_eq!(letters_named_by("aye"), vec![letter('A'), letter('I')]);
        for expected in ['A', 'I'] {
            let outcome = classify_default(expected, "Aye", 0.9);
            assert!(outcome.is_match, "{expected}");
            assert_eq!(outcome.kind, Some(MatchKind::Variant));
            assert_eq!(outcome.score, 81.0);
        }
    }

    #[test]
    fn shared_form_of_two_confusables_is_ambiguous() {
        // "aye" names both A and I; only A sits in H's group, but two
        // letters claim the form.
        let outcome = classify_default('H', "aye", 0.9);
        assert_eq!(outcome.error, Some(ErrorType::Ambiguous));
    }

    #[test]
    fn own_dialect_rendering_is_exact() {
        let z = letter('Z');
        let policy = ScoringPolicy::default();
        let uk = classify(z, Some(Accent::Uk), "Zed.", 0.8, &policy);
        assert!(uk.is_match);
        assert_eq!(uk.kind, Some(MatchKind::Exact));
        assert_eq!(uk.score, 100.0);

        let us = classify(z, Some(Accent::Us), "Zed.", 0.8, &policy);
        assert_eq!(us.kind, Some(MatchKind::Variant));
        assert_eq!(us.score, 72.0);

        let au = classify(letter('H'), Some(Accent::Au), "haitch", 0.3, &policy);
        assert_eq!(au.score, 100.0);
    }

    #[test]
    fn dialect_renderings_are_variants() {
        assert!(variant_forms(letter('H')).contains(&"haitch".to_string()));
        assert!(variant_forms(letter('Z')).contains(&"zed".to_string()));
        assert!(!variant_forms(letter('A')).contains(&"hey".to_string()));
    }
}
