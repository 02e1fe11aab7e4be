//! Speech-to-text collaborators used to validate generated clips.
//!
//! # Available Transcribers
//!
//! - [`WhisperCppEngine`] - whisper.cpp's `whisper-cli` with a ggml model

pub mod whisper;

use serde::{Deserialize, Serialize};

pub use whisper::WhisperCppEngine;

/// Text recognised in one clip, with the recogniser's confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub confidence: f32,
}

impl Transcription {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
