//! Pronunciation validation of a generated dataset.
//!
//! Every sampled clip under `<output_dir>/<LETTER>/` is transcribed, the
//! transcript is compared with the letter named by the clip's directory, and
//! the per-file results are aggregated into a [`ValidationReport`].
//!
//! Per-file problems (unreadable audio, a failing transcriber, a wrong or
//! empty transcript) are recorded on that file's [`ValidationResult`]. Only a
//! missing root directory or an unwritable report aborts the run.

pub mod matching;
pub mod report;

use std::path::{Path, PathBuf};

use derive_builder::Builder;

pub use matching::{classify, normalize, ErrorType, MatchKind, MatchOutcome, ScoringPolicy};
pub use report::{summarize, LetterStats, ModelInfo, ValidationReport, ValidationResult, ValidationSummary};

use crate::accent::Accent;
use crate::alphabet::Letter;
use crate::audio::probe_duration;
use crate::config::ModelSize;
use crate::dataset::{scan_letter_dirs, ClipName, SamplingPolicy};
use crate::error::PipelineError;
use crate::report::write_json_report;
use crate::TranscriptionEngine;

pub const DEFAULT_REPORT_PATH: &str = "validation_report.json";

const PROGRESS_EVERY: usize = 10;

/// Options for one validation run.
///
/// ```
/// use alphabet_tts::validate::ValidationOptionsBuilder;
///
/// let options = ValidationOptionsBuilder::default()
///     .output_dir("outputs")
///     .sample_rate(0.25)
///     .seed(7u64)
///     .build()
///     .unwrap();
/// assert_eq!(options.report_path.to_str(), Some("validation_report.json"));
///
/// assert!(ValidationOptionsBuilder::default()
///     .output_dir("outputs")
///     .sample_rate(1.5)
///     .build()
///     .is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ValidationOptions {
    /// Root holding one sub-directory per letter.
    pub output_dir: PathBuf,
    /// Per-letter cap, first files by name.
    #[builder(default, setter(strip_option))]
    pub max_files: Option<usize>,
    /// Independent inclusion probability per file.
    #[builder(default, setter(strip_option))]
    pub sample_rate: Option<f64>,
    #[builder(default)]
    pub model_size: ModelSize,
    #[builder(default = "PathBuf::from(DEFAULT_REPORT_PATH)")]
    pub report_path: PathBuf,
    /// Seed for `sample_rate` draws.
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
    #[builder(default)]
    pub scoring: ScoringPolicy,
}

impl ValidationOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(rate)) = self.sample_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!("sample_rate must be within 0..=1, got {rate}"));
            }
        }
        if let Some(Some(0)) = self.max_files {
            return Err("max_files must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl ValidationOptions {
    pub fn sampling(&self) -> SamplingPolicy {
        SamplingPolicy {
            max_files: self.max_files,
            sample_rate: self.sample_rate,
            seed: self.seed,
        }
    }
}

/// Transcribe and judge a single clip.
pub fn validate_file(
    engine: &mut dyn TranscriptionEngine,
    path: &Path,
    root: &Path,
    expected: Letter,
    scoring: &ScoringPolicy,
) -> ValidationResult {
    let relative_path = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    let clip = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(ClipName::parse);
    if let Some(name) = &clip {
        if name.letter != expected {
            log::warn!(
                "{relative_path}: file name says {} but directory says {expected}",
                name.letter
            );
        }
    }
    let accent = clip.and_then(|name| Accent::lookup(&name.accent));

    let audio_duration_seconds = probe_duration(path).unwrap_or_else(|e| {
        log::warn!("{relative_path}: could not read duration: {e}");
        0.0
    });

    let transcription = match engine.transcribe(path) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("{relative_path}: transcription failed: {e}");
            return ValidationResult {
                file_path: path.to_path_buf(),
                relative_path,
                expected_letter: expected,
                transcribed_text: String::new(),
                normalized_text: String::new(),
                is_match: false,
                match_kind: None,
                confidence: 0.0,
                audio_duration_seconds,
                validation_score: 0.0,
                error_type: Some(ErrorType::TranscriptionFailed),
                error_message: Some(e.to_string()),
            };
        }
    };

    let outcome = classify(
        expected,
        accent,
        &transcription.text,
        transcription.confidence,
        scoring,
    );
    if !outcome.is_match {
        log::debug!(
            "{relative_path}: expected {expected}, heard {:?} ({})",
            transcription.text,
            outcome.error.map(ErrorType::as_str).unwrap_or("no match")
        );
    }

    ValidationResult {
        file_path: path.to_path_buf(),
        relative_path,
        expected_letter: expected,
        transcribed_text: transcription.text,
        normalized_text: outcome.normalized_text,
        is_match: outcome.is_match,
        match_kind: outcome.kind,
        confidence: transcription.confidence,
        audio_duration_seconds,
        validation_score: outcome.score,
        error_type: outcome.error,
        error_message: None,
    }
}

/// Validate every sampled clip under `options.output_dir` and write the
/// report to `options.report_path`.
pub fn validate_directory(
    engine: &mut dyn TranscriptionEngine,
    options: &ValidationOptions,
) -> Result<ValidationReport, PipelineError> {
    let report = run_validation(engine, options)?;
    write_json_report(&options.report_path, &report)?;
    log::info!("Report written to {}", options.report_path.display());
    Ok(report)
}

/// Like [`validate_directory`] but without writing the report.
pub fn run_validation(
    engine: &mut dyn TranscriptionEngine,
    options: &ValidationOptions,
) -> Result<ValidationReport, PipelineError> {
    let root = options.output_dir.as_path();
    let discovered = scan_letter_dirs(root)?;
    let files_discovered: usize = discovered.values().map(Vec::len).sum();
    let sampled = options.sampling().apply(&discovered);
    let total: usize = sampled.values().map(Vec::len).sum();

    log::info!(
        "Validating {total} of {files_discovered} clips in {} with {}",
        root.display(),
        engine.describe()
    );

    let mut results = Vec::with_capacity(total);
    for (&letter, paths) in &sampled {
        for path in paths {
            results.push(validate_file(engine, path, root, letter, &options.scoring));
            if results.len() % PROGRESS_EVERY == 0 {
                log::info!("Processed {}/{total} files", results.len());
            }
        }
    }

    let model_info = ModelInfo {
        model_size: options.model_size,
        transcriber: engine.describe(),
        device: engine.device(),
        max_files: options.max_files,
        sample_rate: options.sample_rate,
        seed: options.seed,
        scoring: options.scoring,
    };
    let report = ValidationReport::new(files_discovered, model_info, results);

    let s = &report.summary;
    log::info!(
        "Validation complete: {}/{} matched ({:.1}%), average score {:.1}",
        s.matched,
        s.total_files,
        s.match_rate,
        s.average_validation_score
    );
    for (error, count) in &s.error_counts {
        log::info!("  {error}: {count}");
    }
    Ok(report)
}
