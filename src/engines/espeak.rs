//! eSpeak-ng formant synthesis.
//!
//! Lightweight and fully deterministic, so variant diversity comes from the
//! per-variant speaking-rate and pitch jitter the orchestrator applies.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>

use std::path::PathBuf;

use crate::accent::Accent;
use crate::engines::process::{locate_binary, run_tool};
use crate::engines::{read_tool_output, scratch_dir, SynthesisParams, VoiceVariant};
use crate::error::SynthesisError;
use crate::{AudioBuffer, SynthesisEngine};

/// eSpeak-ng default speed in words per minute.
pub const DEFAULT_WPM: f32 = 175.0;

pub const DEFAULT_PITCH: u8 = 50;

/// (accent, espeak voice, style, pitch)
const VOICES: &[(Accent, &str, &str, u8)] = &[
    (Accent::Us, "en-us", "default", 50),
    (Accent::Uk, "en-gb", "default", 50),
    (Accent::Uk, "en-gb-x-rp", "rp", 50),
    (Accent::Uk, "en-gb-scotland", "scotland", 50),
    (Accent::Uk, "en-gb-x-gbclan", "gbclan-low", 40),
    (Accent::Uk, "en-gb-x-gbclan", "gbclan-high", 60),
];

pub struct EspeakEngine {
    bin_path: PathBuf,
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new(PathBuf::from("espeak-ng"))
    }
}

impl EspeakEngine {
    pub fn new(bin_path: PathBuf) -> Self {
        Self { bin_path }
    }

    fn command_args(text: &str, params: &SynthesisParams, out: &str) -> Vec<String> {
        let wpm = (DEFAULT_WPM * params.speaking_rate).round().clamp(80.0, 450.0) as u32;
        let pitch = params.pitch.unwrap_or(DEFAULT_PITCH).min(99);
        vec![
            "-v".to_string(),
            params.voice.clone(),
            "-p".to_string(),
            pitch.to_string(),
            "-s".to_string(),
            wpm.to_string(),
            "-w".to_string(),
            out.to_string(),
            text.to_string(),
        ]
    }
}

impl SynthesisEngine for EspeakEngine {
    fn name(&self) -> &'static str {
        "espeak"
    }

    fn supports_pitch(&self) -> bool {
        true
    }

    fn check_available(&self) -> Result<(), SynthesisError> {
        locate_binary(&self.bin_path)
            .map(|_| ())
            .ok_or_else(|| SynthesisError::ToolNotFound(self.bin_path.display().to_string()))
    }

    fn voices(&self, accents: &[Accent]) -> Vec<VoiceVariant> {
        VOICES
            .iter()
            .filter(|(accent, ..)| accents.contains(accent))
            .map(|&(accent, voice, style, pitch)| {
                VoiceVariant::new(accent, style, voice).with_pitch(pitch)
            })
            .collect()
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<AudioBuffer, SynthesisError> {
        let scratch = scratch_dir()?;
        let out = scratch.path().join("espeak.wav");
        let args = Self::command_args(text, params, &out.to_string_lossy());
        run_tool(&self.bin_path, &args, None)?;
        read_tool_output(&out)
    }
}
