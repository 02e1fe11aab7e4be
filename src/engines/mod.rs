//! Speech synthesis engines.
//!
//! Every backend implements [`SynthesisEngine`](crate::SynthesisEngine) and
//! shells out to (or calls over HTTP) a third-party TTS system.
//!
//! # Available Engines
//!
//! - `espeak` - eSpeak-ng formant synthesis (`espeak-ng` on PATH)
//! - `piper` - Piper neural voices (`piper` binary plus `.onnx` voices)
//! - `xtts` - Coqui XTTS v2 voice cloning (`tts` CLI plus reference clips)
//! - `gtts` - Google Translate TTS over HTTPS, enabled with the `gtts` Cargo
//!   feature (needs `ffmpeg` to turn the MP3 response into WAV)

pub mod espeak;
#[cfg(feature = "gtts")]
pub mod gtts;
pub mod piper;
pub(crate) mod process;
pub mod xtts;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::accent::Accent;
use crate::audio;
use crate::config::Settings;
use crate::error::SynthesisError;
use crate::{AudioBuffer, SynthesisEngine};

pub use process::locate_binary;

/// One voice an engine offers: an accent plus engine-specific knobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceVariant {
    pub accent: Accent,
    /// File-name safe style token (`natural`, `lessac-medium`, `clone`).
    pub style: String,
    /// Engine-specific voice identifier (gTTS domain, Piper model, eSpeak
    /// voice, reference clip).
    pub voice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<u8>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub slow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_audio: Option<PathBuf>,
}

impl VoiceVariant {
    pub fn new(accent: Accent, style: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            accent,
            style: style.into(),
            voice: voice.into(),
            pitch: None,
            slow: false,
            reference_audio: None,
        }
    }

    pub fn with_pitch(mut self, pitch: u8) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn slow(mut self) -> Self {
        self.slow = true;
        self
    }

    pub fn with_reference(mut self, path: PathBuf) -> Self {
        self.reference_audio = Some(path);
        self
    }
}

/// Parameters for one synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    pub accent: Accent,
    pub voice: String,
    /// Speaking-rate multiplier; 1.0 is the engine default.
    pub speaking_rate: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<u8>,
    pub seed: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub slow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_audio: Option<PathBuf>,
}

impl SynthesisParams {
    pub fn for_voice(voice: &VoiceVariant, speaking_rate: f32, seed: u64) -> Self {
        Self {
            accent: voice.accent,
            voice: voice.voice.clone(),
            speaking_rate,
            pitch: voice.pitch,
            seed,
            slow: voice.slow,
            reference_audio: voice.reference_audio.clone(),
        }
    }
}

/// Selectable backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum EngineKind {
    Gtts,
    Piper,
    Espeak,
    Xtts,
}

impl EngineKind {
    pub const ALL: [EngineKind; 4] = [
        EngineKind::Gtts,
        EngineKind::Piper,
        EngineKind::Espeak,
        EngineKind::Xtts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Gtts => "gtts",
            EngineKind::Piper => "piper",
            EngineKind::Espeak => "espeak",
            EngineKind::Xtts => "xtts",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown engine '{s}'"))
    }
}

/// Build an engine from process settings.
pub fn build_engine(
    kind: EngineKind,
    settings: &Settings,
) -> Result<Box<dyn SynthesisEngine>, SynthesisError> {
    let engine: Box<dyn SynthesisEngine> = match kind {
        #[cfg(feature = "gtts")]
        EngineKind::Gtts => Box::new(gtts::GttsEngine::new(settings.ffmpeg_bin.clone())?),
        #[cfg(not(feature = "gtts"))]
        EngineKind::Gtts => {
            return Err(SynthesisError::ToolNotFound(
                "gtts (rebuild with the `gtts` feature)".to_string(),
            ))
        }
        EngineKind::Piper => Box::new(piper::PiperEngine::new(
            settings.piper_bin.clone(),
            settings.piper_voices_dir(),
        )),
        EngineKind::Espeak => Box::new(espeak::EspeakEngine::new(settings.espeak_bin.clone())),
        EngineKind::Xtts => Box::new(xtts::XttsEngine::new(
            settings.xtts_bin.clone(),
            settings.reference_dir.clone(),
            settings.device,
        )),
    };
    Ok(engine)
}

/// Decode a WAV file an external tool wrote, rejecting empty output.
pub(crate) fn read_tool_output(path: &Path) -> Result<AudioBuffer, SynthesisError> {
    if !path.exists() {
        return Err(SynthesisError::EmptyAudio);
    }
    let (audio, _) = audio::read_wav(path)?;
    if audio.is_empty() {
        return Err(SynthesisError::EmptyAudio);
    }
    Ok(audio)
}

/// Fresh scratch directory for a tool invocation.
pub(crate) fn scratch_dir() -> Result<tempfile::TempDir, SynthesisError> {
    Ok(tempfile::Builder::new().prefix("alphabet-tts-").tempdir()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kind_parses_case_insensitively() {
        assert_eq!("ESPEAK".parse::<EngineKind>(), Ok(EngineKind::Espeak));
        assert!("festival".parse::<EngineKind>().is_err());
    }

    #[test]
    fn params_copy_voice_knobs() {
        let voice = VoiceVariant::new(Accent::Uk, "rp", "en-gb-x-rp").with_pitch(60);
        let params = SynthesisParams::for_voice(&voice, 0.9, 5);
        assert_eq!(params.accent, Accent::Uk);
        assert_eq!(params.voice, "en-gb-x-rp");
        assert_eq!(params.pitch, Some(60));
        assert_eq!(params.seed, 5);
        assert!(!params.slow);
    }

    #[test]
    fn params_serialize_without_empty_fields() {
        let voice = VoiceVariant::new(Accent::Us, "natural", "com");
        let json = serde_json::to_value(SynthesisParams::for_voice(&voice, 1.0, 1)).unwrap();
        assert_eq!(json["accent"], "en-US");
        assert!(json.get("pitch").is_none());
        assert!(json.get("slow").is_none());
        assert!(json.get("reference_audio").is_none());
    }

    #[test]
    fn missing_tool_output_is_empty_audio() {
        let err = read_tool_output(Path::new("/no/such/file.wav")).unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyAudio));
    }
}
