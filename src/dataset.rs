//! On-disk layout of the dataset: `outputs/<LETTER>/<clip>.wav`.
//!
//! Clip names follow `<engine>_<accent>_<style>_<NN>_<letter>.wav`, e.g.
//! `gtts_us_natural_01_a.wav`. The style may itself contain underscores; the
//! engine, accent, variant and letter tokens never do.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::alphabet::Letter;
use crate::error::PipelineError;

/// Parsed form of a clip file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipName {
    pub engine: String,
    pub accent: String,
    pub style: String,
    pub variant: u32,
    pub letter: Letter,
}

impl ClipName {
    pub fn new(
        engine: impl Into<String>,
        accent: impl Into<String>,
        style: impl Into<String>,
        variant: u32,
        letter: Letter,
    ) -> Self {
        Self {
            engine: engine.into(),
            accent: accent.into(),
            style: style.into(),
            variant,
            letter,
        }
    }

    /// Parse a file name or stem. Returns `None` if it does not follow the
    /// naming scheme.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name
            .strip_suffix(".wav")
            .or_else(|| file_name.strip_suffix(".WAV"))
            .unwrap_or(file_name);
        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() < 5 {
            return None;
        }

        let letter = Letter::parse(parts[parts.len() - 1])?;
        let variant_token = parts[parts.len() - 2];
        if variant_token.is_empty() || !variant_token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let variant = variant_token.parse().ok()?;
        let style = parts[2..parts.len() - 2].join("_");
        if parts[0].is_empty() || parts[1].is_empty() || style.is_empty() {
            return None;
        }

        Some(Self {
            engine: parts[0].to_string(),
            accent: parts[1].to_string(),
            style,
            variant,
            letter,
        })
    }

    pub fn file_name(&self) -> String {
        self.to_string()
    }

    /// Full output path below the dataset root.
    pub fn path_in(&self, root: &Path) -> PathBuf {
        letter_dir(root, self.letter).join(self.file_name())
    }
}

impl fmt::Display for ClipName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{:02}_{}.wav",
            self.engine,
            self.accent,
            self.style,
            self.variant,
            self.letter.lowercase()
        )
    }
}

/// Directory holding clips for one letter.
pub fn letter_dir(root: &Path, letter: Letter) -> PathBuf {
    root.join(letter.as_char().to_string())
}

/// Make a voice/style name safe to embed in a clip file name.
pub fn sanitize_token(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    cleaned.trim_matches('-').to_string()
}

/// WAV files found under each letter directory, sorted by file name.
pub type LetterFiles = BTreeMap<Letter, Vec<PathBuf>>;

/// Collect `<root>/<LETTER>/*.wav` for every letter directory that exists.
///
/// Fails only when `root` itself is missing.
pub fn scan_letter_dirs(root: &Path) -> Result<LetterFiles, PipelineError> {
    if !root.is_dir() {
        return Err(PipelineError::MissingDirectory(root.to_path_buf()));
    }

    let mut files = LetterFiles::new();
    for letter in Letter::all() {
        let dir = letter_dir(root, letter);
        if !dir.is_dir() {
            continue;
        }

        let mut wavs = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| PipelineError::io("listing letter directory", e))? {
            let path = entry
                .map_err(|e| PipelineError::io("listing letter directory", e))?
                .path();
            let is_wav = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
            if is_wav && path.is_file() {
                wavs.push(path);
            }
        }
        wavs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        log::debug!("{}: {} clips", dir.display(), wavs.len());
        files.insert(letter, wavs);
    }
    Ok(files)
}

/// Which files of a scan get processed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingPolicy {
    /// Keep at most this many files per letter, in file-name order.
    pub max_files: Option<usize>,
    /// Keep each file independently with this probability.
    pub sample_rate: Option<f64>,
    /// Seed for the inclusion draws; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl SamplingPolicy {
    pub fn all() -> Self {
        Self::default()
    }

    /// Apply the policy. Random inclusion runs first, then the per-letter
    /// cap, so both may be combined.
    pub fn apply(&self, files: &LetterFiles) -> LetterFiles {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let rate = self.sample_rate.map(|r| r.clamp(0.0, 1.0));

        files
            .iter()
            .map(|(&letter, paths)| {
                let mut kept: Vec<PathBuf> = match rate {
                    Some(r) if r < 1.0 => paths
                        .iter()
                        .filter(|_| rng.random_bool(r))
                        .cloned()
                        .collect(),
                    _ => paths.clone(),
                };
                if let Some(cap) = self.max_files {
                    kept.truncate(cap);
                }
                (letter, kept)
            })
            .collect()
    }
}
