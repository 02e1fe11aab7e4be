//! # alphabet-tts
//!
//! Build a labelled dataset of spoken letters A–Z in several English accents
//! by driving third-party text-to-speech engines, then check every clip with
//! a speech recogniser and with signal-level quality metrics.
//!
//! ## Features
//!
//! - **Multiple engines**: gTTS, Piper, eSpeak-ng and XTTS voice cloning behind
//!   one [`SynthesisEngine`] interface
//! - **Accent coverage**: eight English dialects with their own letter
//!   renderings ("zed", "haitch")
//! - **Pronunciation validation**: whisper.cpp transcription matched against
//!   spelling variants and acoustic confusables, with per-letter statistics
//! - **Quality checks**: silence, clipping, loudness and duration bounds
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! alphabet-tts = { version = "2026.10", features = ["gtts"] }
//! ```
//!
//! ```ignore
//! use std::path::Path;
//! use alphabet_tts::{
//!     transcription::WhisperCppEngine, validate::{validate_directory, ValidationOptionsBuilder},
//!     ModelSize, TranscriptionEngine,
//! };
//!
//! let mut whisper = WhisperCppEngine::new(Path::new("models/whisper"));
//! whisper.load_model(ModelSize::Base)?;
//!
//! let options = ValidationOptionsBuilder::default()
//!     .output_dir("outputs")
//!     .max_files(5usize)
//!     .build()?;
//! let report = validate_directory(&mut whisper, &options)?;
//! println!("match rate: {:.1}%", report.summary.match_rate);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod accent;
pub mod alphabet;
pub mod audio;
pub mod config;
pub mod dataset;
pub mod engines;
pub mod error;
pub mod generate;
pub mod quality;
pub mod references;
pub mod report;
pub mod transcription;
pub mod validate;

use std::path::Path;

pub use accent::Accent;
pub use alphabet::Letter;
pub use config::{Device, ModelSize, Settings};
pub use engines::{SynthesisParams, VoiceVariant};
pub use error::{AudioError, PipelineError, SynthesisError, TranscriptionError};
pub use transcription::Transcription;

/// Mono audio produced by an engine or decoded from disk.
///
/// Samples are `f32` in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Write the audio to a 16-bit PCM WAV file, clamping out-of-range samples.
    pub fn write_wav(&self, path: &Path) -> Result<(), AudioError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32).round() as i16)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Common interface for text-to-speech backends.
///
/// The generation orchestrator only talks to engines through this trait, so
/// backends are interchangeable and can be held as `Box<dyn SynthesisEngine>`.
pub trait SynthesisEngine {
    /// Short lowercase name used as the first token of clip file names.
    fn name(&self) -> &'static str;

    /// Probe whether the backend can run at all (binary on PATH, network
    /// client built, ...).
    fn check_available(&self) -> Result<(), SynthesisError>;

    /// Voices this engine offers for the requested accents.
    fn voices(&self, accents: &[Accent]) -> Vec<VoiceVariant>;

    /// Text to speak for `letter`. Defaults to the accent's rendering of the
    /// letter's name.
    fn text_for(&self, letter: Letter, accent: Accent) -> String {
        accent.pronunciation(letter).to_string()
    }

    /// Whether [`SynthesisParams::pitch`] has any effect on this engine.
    fn supports_pitch(&self) -> bool {
        false
    }

    /// Synthesize speech from the given text.
    fn synthesize(
        &mut self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<AudioBuffer, SynthesisError>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `AudioBuffer::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: &SynthesisParams,
    ) -> Result<AudioBuffer, SynthesisError> {
        let audio = self.synthesize(text, params)?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        audio.write_wav(wav_path)?;
        Ok(audio)
    }
}

/// Common interface for speech-to-text backends.
///
/// A transcriber is an explicit handle: load a model once, pass the engine to
/// the validation routine, unload when done.
pub trait TranscriptionEngine {
    /// Load the model of the given size, replacing any loaded model.
    fn load_model(&mut self, size: ModelSize) -> Result<(), TranscriptionError>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Transcribe one audio file.
    fn transcribe(&mut self, audio_path: &Path) -> Result<Transcription, TranscriptionError>;

    /// Human-readable description of the loaded model for reports.
    fn describe(&self) -> String {
        "unknown".to_string()
    }

    /// Device the model runs on, if the backend has one.
    fn device(&self) -> Option<Device> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_of_empty_rate_is_zero() {
        let audio = AudioBuffer {
            samples: vec![0.0; 10],
            sample_rate: 0,
        };
        assert_eq!(audio.duration_secs(), 0.0);
    }

    #[test]
    fn write_wav_clamps_and_round_trips_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let audio = AudioBuffer {
            samples: vec![0.0, 0.5, 2.0, -2.0],
            sample_rate: 16_000,
        };
        audio.write_wav(&path).unwrap();

        let (decoded, format) = audio::read_wav(&path).unwrap();
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(decoded.samples.len(), 4);
        assert!(decoded.samples[2] > 0.99);
        assert!(decoded.samples[3] < -0.99);
    }
}
