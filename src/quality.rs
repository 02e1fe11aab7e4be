//! Signal-level quality checks, independent of transcription.
//!
//! Each clip is measured for duration, loudness, silence and clipping and
//! compared against [`QualityThresholds`]. Unreadable clips are listed in the
//! report rather than aborting the run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alphabet::Letter;
use crate::audio::{read_wav, WavFormat};
use crate::dataset::{scan_letter_dirs, ClipName};
use crate::error::{AudioError, PipelineError};
use crate::AudioBuffer;

pub const DEFAULT_REPORT_PATH: &str = "audio_quality_report.json";

/// Acceptance bounds for one clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub min_duration: f64,
    pub max_duration: f64,
    pub min_rms: f32,
    /// Absolute amplitude at or above which a sample counts as clipped.
    pub clipping_threshold: f32,
    pub max_clipped_ratio: f64,
    /// Absolute amplitude below which a sample counts as silent.
    pub silence_threshold: f32,
    pub max_silence_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_duration: 0.3,
            max_duration: 3.0,
            min_rms: 0.01,
            clipping_threshold: 0.99,
            max_clipped_ratio: 0.0,
            silence_threshold: 0.001,
            max_silence_ratio: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    TooShort,
    TooLong,
    Clipping,
    TooQuiet,
    MostlySilent,
}

impl QualityIssue {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::Clipping => "clipping",
            Self::TooQuiet => "too_quiet",
            Self::MostlySilent => "mostly_silent",
        }
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMetrics {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub rms: f32,
    pub peak: f32,
    pub silence_ratio: f64,
    pub clipped_ratio: f64,
}

impl AudioMetrics {
    pub fn measure(audio: &AudioBuffer, format: &WavFormat, thresholds: &QualityThresholds) -> Self {
        let n = audio.samples.len();
        let (mut sum_sq, mut peak, mut silent, mut clipped) = (0.0f64, 0.0f32, 0usize, 0usize);
        for &s in &audio.samples {
            let a = s.abs();
            sum_sq += f64::from(s) * f64::from(s);
            peak = peak.max(a);
            if a < thresholds.silence_threshold {
                silent += 1;
            }
            if a >= thresholds.clipping_threshold {
                clipped += 1;
            }
        }

        let ratio = |count: usize| if n == 0 { 0.0 } else { count as f64 / n as f64 };
        Self {
            duration_seconds: audio.duration_secs(),
            sample_rate: format.sample_rate,
            channels: format.channels,
            bits_per_sample: format.bits_per_sample,
            rms: if n == 0 { 0.0 } else { (sum_sq / n as f64).sqrt() as f32 },
            peak,
            silence_ratio: if n == 0 { 1.0 } else { ratio(silent) },
            clipped_ratio: ratio(clipped),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityChecks {
    pub duration_ok: bool,
    pub not_clipping: bool,
    pub loud_enough: bool,
    pub not_mostly_silent: bool,
}

impl QualityChecks {
    pub fn evaluate(metrics: &AudioMetrics, thresholds: &QualityThresholds) -> Self {
        Self {
            duration_ok: (thresholds.min_duration..=thresholds.max_duration)
                .contains(&metrics.duration_seconds),
            not_clipping: metrics.clipped_ratio <= thresholds.max_clipped_ratio,
            loud_enough: metrics.rms >= thresholds.min_rms,
            not_mostly_silent: metrics.silence_ratio <= thresholds.max_silence_ratio,
        }
    }

    fn issues(&self, metrics: &AudioMetrics, thresholds: &QualityThresholds) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        if metrics.duration_seconds < thresholds.min_duration {
            issues.push(QualityIssue::TooShort);
        }
        if metrics.duration_seconds > thresholds.max_duration {
            issues.push(QualityIssue::TooLong);
        }
        if !self.not_clipping {
            issues.push(QualityIssue::Clipping);
        }
        if !self.loud_enough {
            issues.push(QualityIssue::TooQuiet);
        }
        if !self.not_mostly_silent {
            issues.push(QualityIssue::MostlySilent);
        }
        issues
    }
}

/// `100 - 15 per issue - 10 per second away from a one-second clip`.
pub fn quality_score(issue_count: usize, duration_seconds: f64) -> f64 {
    (100.0 - 15.0 * issue_count as f64 - 10.0 * (duration_seconds - 1.0).abs()).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    pub file_path: PathBuf,
    pub relative_path: String,
    pub letter: Option<Letter>,
    pub engine: Option<String>,
    pub accent: Option<String>,
    pub style: Option<String>,
    pub variant: Option<u32>,
    #[serde(flatten)]
    pub metrics: AudioMetrics,
    #[serde(flatten)]
    pub checks: QualityChecks,
    pub issues: Vec<QualityIssue>,
    pub quality_score: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnreadableFile {
    pub file_path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub total_files: usize,
    pub clean_files: usize,
    pub files_with_issues: usize,
    pub unreadable_files: usize,
    pub quality_rate: f64,
    pub average_quality_score: f64,
    pub duration: Range,
    pub median_duration: f64,
    pub rms: Range,
    pub sample_rates: BTreeSet<u32>,
    pub issues_by_type: BTreeMap<QualityIssue, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub generated_at: DateTime<Utc>,
    pub thresholds: QualityThresholds,
    pub summary: QualitySummary,
    pub results: Vec<QualityResult>,
    pub unreadable_files: Vec<UnreadableFile>,
}

impl QualityReport {
    pub fn has_issues(&self) -> bool {
        self.summary.files_with_issues > 0 || !self.unreadable_files.is_empty()
    }
}

/// Measure one decoded clip.
pub fn check_audio(
    path: &Path,
    root: &Path,
    audio: &AudioBuffer,
    format: &WavFormat,
    thresholds: &QualityThresholds,
) -> QualityResult {
    let metrics = AudioMetrics::measure(audio, format, thresholds);
    let checks = QualityChecks::evaluate(&metrics, thresholds);
    let issues = checks.issues(&metrics, thresholds);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(ClipName::parse);

    QualityResult {
        file_path: path.to_path_buf(),
        relative_path: path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/"),
        letter: name.as_ref().map(|n| n.letter),
        engine: name.as_ref().map(|n| n.engine.clone()),
        accent: name.as_ref().map(|n| n.accent.clone()),
        style: name.as_ref().map(|n| n.style.clone()),
        variant: name.as_ref().map(|n| n.variant),
        quality_score: quality_score(issues.len(), metrics.duration_seconds),
        passed: issues.is_empty(),
        metrics,
        checks,
        issues,
    }
}

pub fn check_file(
    path: &Path,
    root: &Path,
    thresholds: &QualityThresholds,
) -> Result<QualityResult, AudioError> {
    let (audio, format) = read_wav(path)?;
    Ok(check_audio(path, root, &audio, &format, thresholds))
}

/// Check every clip under `<root>/<LETTER>/`.
pub fn check_directory(
    root: &Path,
    thresholds: &QualityThresholds,
) -> Result<QualityReport, PipelineError> {
    let files = scan_letter_dirs(root)?;
    let total: usize = files.values().map(Vec::len).sum();
    log::info!("Checking audio quality of {total} clips in {}", root.display());

    let mut results = Vec::with_capacity(total);
    let mut unreadable = Vec::new();
    for path in files.values().flatten() {
        match check_file(path, root, thresholds) {
            Ok(result) => {
                if !result.passed {
                    log::debug!("{}: {:?}", result.relative_path, result.issues);
                }
                results.push(result);
            }
            Err(e) => {
                log::warn!("{}: {e}", path.display());
                unreadable.push(UnreadableFile {
                    file_path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let summary = summarize(&results, unreadable.len());
    log::info!(
        "{}/{} clips clean ({:.1}%), {} unreadable",
        summary.clean_files,
        summary.total_files,
        summary.quality_rate,
        summary.unreadable_files
    );
    Ok(QualityReport {
        generated_at: Utc::now(),
        thresholds: *thresholds,
        summary,
        results,
        unreadable_files: unreadable,
    })
}

fn range(values: &[f64]) -> Range {
    if values.is_empty() {
        return Range::default();
    }
    Range {
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        avg: values.iter().sum::<f64>() / values.len() as f64,
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

pub fn summarize(results: &[QualityResult], unreadable_files: usize) -> QualitySummary {
    let durations: Vec<f64> = results.iter().map(|r| r.metrics.duration_seconds).collect();
    let rms: Vec<f64> = results.iter().map(|r| f64::from(r.metrics.rms)).collect();
    let clean = results.iter().filter(|r| r.passed).count();

    let mut issues_by_type = BTreeMap::new();
    for issue in results.iter().flat_map(|r| r.issues.iter()) {
        *issues_by_type.entry(*issue).or_default() += 1;
    }

    QualitySummary {
        total_files: results.len(),
        clean_files: clean,
        files_with_issues: results.len() - clean,
        unreadable_files,
        quality_rate: if results.is_empty() {
            0.0
        } else {
            clean as f64 / results.len() as f64 * 100.0
        },
        average_quality_score: if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.quality_score).sum::<f64>() / results.len() as f64
        },
        duration: range(&durations),
        median_duration: median(&durations),
        rms: range(&rms),
        sample_rates: results.iter().map(|r| r.metrics.sample_rate).collect(),
        issues_by_type,
    }
}
