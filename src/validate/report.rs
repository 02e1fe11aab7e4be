use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::matching::{ErrorType, MatchKind, ScoringPolicy};
use crate::alphabet::Letter;
use crate::config::{Device, ModelSize};

/// Outcome for one audio file. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub file_path: PathBuf,
    /// Path relative to the scanned root, e.g. `A/gtts_us_natural_01_a.wav`.
    pub relative_path: String,
    pub expected_letter: Letter,
    pub transcribed_text: String,
    pub normalized_text: String,
    pub is_match: bool,
    pub match_kind: Option<MatchKind>,
    pub confidence: f32,
    pub audio_duration_seconds: f64,
    pub validation_score: f64,
    pub error_type: Option<ErrorType>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LetterStats {
    pub total: usize,
    pub matched: usize,
    pub failed: usize,
    pub match_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Files found before sampling.
    pub files_discovered: usize,
    pub total_files: usize,
    pub matched: usize,
    pub failed: usize,
    pub match_rate: f64,
    pub average_validation_score: f64,
    pub average_audio_duration: f64,
    pub total_audio_duration: f64,
    pub error_counts: BTreeMap<ErrorType, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_size: ModelSize,
    pub transcriber: String,
    /// Compute device of the transcriber, when it reports one.
    pub device: Option<Device>,
    pub max_files: Option<usize>,
    pub sample_rate: Option<f64>,
    pub seed: Option<u64>,
    pub scoring: ScoringPolicy,
}

/// Everything a validation run writes to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub generated_at: DateTime<Utc>,
    pub summary: ValidationSummary,
    pub letter_breakdown: BTreeMap<Letter, LetterStats>,
    pub model_info: ModelInfo,
    pub all_validations: Vec<ValidationResult>,
    pub failed_validations: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new(files_discovered: usize, model_info: ModelInfo, results: Vec<ValidationResult>) -> Self {
        let (summary, letter_breakdown) = summarize(files_discovered, &results);
        let failed_validations = results.iter().filter(|r| !r.is_match).cloned().collect();
        Self {
            generated_at: Utc::now(),
            summary,
            letter_breakdown,
            model_info,
            all_validations: results,
            failed_validations,
        }
    }
}

fn rate(matched: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64 * 100.0
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Aggregate per-file results. Empty input yields an all-zero summary.
pub fn summarize(
    files_discovered: usize,
    results: &[ValidationResult],
) -> (ValidationSummary, BTreeMap<Letter, LetterStats>) {
    let mut summary = ValidationSummary {
        files_discovered,
        total_files: results.len(),
        ..ValidationSummary::default()
    };
    let mut breakdown: BTreeMap<Letter, LetterStats> = BTreeMap::new();
    let mut score_sum = 0.0;

    for result in results {
        let stats = breakdown.entry(result.expected_letter).or_default();
        stats.total += 1;
        if result.is_match {
            summary.matched += 1;
            stats.matched += 1;
        } else {
            summary.failed += 1;
            stats.failed += 1;
        }
        if let Some(error) = result.error_type {
            *summary.error_counts.entry(error).or_default() += 1;
        }
        score_sum += result.validation_score;
        summary.total_audio_duration += result.audio_duration_seconds;
    }

    for stats in breakdown.values_mut() {
        stats.match_rate = rate(stats.matched, stats.total);
    }
    summary.match_rate = rate(summary.matched, summary.total_files);
    summary.average_validation_score = mean(score_sum, summary.total_files);
    summary.average_audio_duration = mean(summary.total_audio_duration, summary.total_files);

    (summary, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(letter: char, is_match: bool, score: f64, duration: f64) -> ValidationResult {
        ValidationResult {
            file_path: PathBuf::from(format!("{letter}/x.wav")),
            relative_path: format!("{letter}/x.wav"),
            expected_letter: Letter::new(letter).unwrap(),
            transcribed_text: String::new(),
            normalized_text: String::new(),
            is_match,
            match_kind: is_match.then_some(MatchKind::Exact),
            confidence: 0.5,
            audio_duration_seconds: duration,
            validation_score: score,
            error_type: (!is_match).then_some(ErrorType::WrongLetter),
            error_message: None,
        }
    }

    #[test]
    fn empty_input_is_all_zero() {
        let (summary, breakdown) = summarize(0, &[]);
        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.match_rate, 0.0);
        assert_eq!(summary.average_validation_score, 0.0);
        assert_eq!(summary.average_audio_duration, 0.0);
        assert!(breakdown.is_empty());
    }

    #[test]
    fn breakdown_sums_to_summary() {
        let results = vec![
            result('A', true, 100.0, 1.0),
            result('A', false, 0.0, 0.5),
            result('B', true, 100.0, 0.5),
        ];
        let (summary, breakdown) = summarize(5, &results);

        assert_eq!(summary.files_discovered, 5);
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.match_rate, 2.0 / 3.0 * 100.0);
        assert!((summary.average_validation_score - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.total_audio_duration, 2.0);
        assert_eq!(summary.error_counts.get(&ErrorType::WrongLetter), Some(&1));

        let total: usize = breakdown.values().map(|s| s.total).sum();
        assert_eq!(total, summary.total_files);
        assert_eq!(breakdown[&Letter::new('A').unwrap()].match_rate, 50.0);
    }

    #[test]
    fn report_serializes_letter_keys_and_error_names() {
        let info = ModelInfo {
            model_size: ModelSize::Tiny,
            transcriber: "test".to_string(),
            device: Some(Device::Cuda),
            max_files: None,
            sample_rate: None,
            seed: None,
            scoring: ScoringPolicy::default(),
        };
        let report = ValidationReport::new(2, info, vec![result('C', false, 0.0, 1.0)]);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["letter_breakdown"]["C"]["failed"], 1);
        assert_eq!(json["summary"]["error_counts"]["wrong_letter"], 1);
        assert_eq!(json["failed_validations"][0]["error_type"], "wrong_letter");
        assert_eq!(json["model_info"]["model_size"], "tiny");
        assert_eq!(json["model_info"]["device"], "cuda");
    }
}
