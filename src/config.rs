use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Whisper model size, trading speed for accuracy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    /// ggml model file names whisper.cpp ships for this size, most preferred
    /// first.
    pub fn ggml_candidates(self) -> &'static [&'static str] {
        match self {
            Self::Tiny => &["ggml-tiny.en.bin", "ggml-tiny.bin"],
            Self::Base => &["ggml-base.en.bin", "ggml-base.bin"],
            Self::Small => &["ggml-small.en.bin", "ggml-small.bin"],
            Self::Medium => &["ggml-medium.en.bin", "ggml-medium.bin"],
            Self::Large => &["ggml-large-v3.bin", "ggml-large-v3-turbo.bin", "ggml-large.bin"],
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute device for the model-backed collaborators.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(format!("unknown device '{other}' (expected cpu or cuda)")),
        }
    }
}

/// Process-level settings read from `ALPHABET_*` environment variables
/// (and a `.env` file, if present).
#[derive(Debug, Clone)]
pub struct Settings {
    pub device: Device,
    pub output_dir: PathBuf,
    pub reference_dir: PathBuf,
    pub models_dir: PathBuf,
    pub log_level: String,
    pub seed: u64,
    pub max_duration: f64,
    pub whisper_bin: PathBuf,
    pub piper_bin: PathBuf,
    pub espeak_bin: PathBuf,
    pub xtts_bin: PathBuf,
    pub ffmpeg_bin: PathBuf,
}

impl Settings {
    pub const DEFAULT_SEED: u64 = 42;
    pub const DEFAULT_MAX_DURATION: f64 = 3.0;

    /// Load `.env` (if any) and read settings from the process environment.
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let device = match get("ALPHABET_DEVICE") {
            Some(v) => v.parse().map_err(PipelineError::config)?,
            None => defaults.device,
        };
        let seed = match get("ALPHABET_SEED") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| PipelineError::config(format!("ALPHABET_SEED={v:?}: {e}")))?,
            None => defaults.seed,
        };
        let max_duration = match get("ALPHABET_MAX_DURATION") {
            Some(v) => {
                let parsed: f64 = v.trim().parse().map_err(|e| {
                    PipelineError::config(format!("ALPHABET_MAX_DURATION={v:?}: {e}"))
                })?;
                if !parsed.is_finite() || parsed <= 0.0 {
                    return Err(PipelineError::config(format!(
                        "ALPHABET_MAX_DURATION must be positive, got {parsed}"
                    )));
                }
                parsed
            }
            None => defaults.max_duration,
        };
        let path = |key: &str, default: PathBuf| get(key).map(PathBuf::from).unwrap_or(default);

        Ok(Self {
            device,
            seed,
            max_duration,
            log_level: get("ALPHABET_LOG_LEVEL").unwrap_or(defaults.log_level),
            output_dir: path("ALPHABET_OUTPUT_DIR", defaults.output_dir),
            reference_dir: path("ALPHABET_REFERENCE_DIR", defaults.reference_dir),
            models_dir: path("ALPHABET_MODELS_DIR", defaults.models_dir),
            whisper_bin: path("ALPHABET_WHISPER_BIN", defaults.whisper_bin),
            piper_bin: path("ALPHABET_PIPER_BIN", defaults.piper_bin),
            espeak_bin: path("ALPHABET_ESPEAK_BIN", defaults.espeak_bin),
            xtts_bin: path("ALPHABET_XTTS_BIN", defaults.xtts_bin),
            ffmpeg_bin: path("ALPHABET_FFMPEG_BIN", defaults.ffmpeg_bin),
        })
    }

    pub fn whisper_models_dir(&self) -> PathBuf {
        self.models_dir.join("whisper")
    }

    pub fn piper_voices_dir(&self) -> PathBuf {
        self.models_dir.join("piper")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: Device::default(),
            output_dir: PathBuf::from("outputs"),
            reference_dir: PathBuf::from("references"),
            models_dir: PathBuf::from("models"),
            log_level: "info".to_string(),
            seed: Self::DEFAULT_SEED,
            max_duration: Self::DEFAULT_MAX_DURATION,
            whisper_bin: PathBuf::from("whisper-cli"),
            piper_bin: PathBuf::from("piper"),
            espeak_bin: PathBuf::from("espeak-ng"),
            xtts_bin: PathBuf::from("tts"),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, PipelineError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::default();
        assert_eq!(settings.device, Device::Cpu);
        assert_eq!(settings.output_dir, PathBuf::from("outputs"));
        assert_eq!(settings.reference_dir, PathBuf::from("references"));
        assert_eq!(settings.seed, Settings::DEFAULT_SEED);
        assert_eq!(settings.max_duration, 3.0);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.whisper_models_dir(), PathBuf::from("models/whisper"));
    }

    #[test]
    fn reads_overrides() {
        let settings = settings_from(&[
            ("ALPHABET_DEVICE", "cuda"),
            ("ALPHABET_SEED", "7"),
            ("ALPHABET_MAX_DURATION", "2.5"),
            ("ALPHABET_OUTPUT_DIR", "/data/out"),
            ("ALPHABET_ESPEAK_BIN", "/opt/bin/espeak-ng"),
        ])
        .unwrap();
        assert_eq!(settings.device, Device::Cuda);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.max_duration, 2.5);
        assert_eq!(settings.output_dir, PathBuf::from("/data/out"));
        assert_eq!(settings.espeak_bin, PathBuf::from("/opt/bin/espeak-ng"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let settings = settings_from(&[("ALPHABET_SEED", "  ")]).unwrap();
        assert_eq!(settings.seed, Settings::DEFAULT_SEED);
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(matches!(
            settings_from(&[("ALPHABET_SEED", "abc")]),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            settings_from(&[("ALPHABET_MAX_DURATION", "-1")]),
            Err(PipelineError::Config(_))
        ));
        assert!(matches!(
            settings_from(&[("ALPHABET_DEVICE", "tpu")]),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn model_size_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ModelSize::Medium).unwrap(), "\"medium\"");
        assert_eq!(ModelSize::Tiny.ggml_candidates()[0], "ggml-tiny.en.bin");
    }
}
