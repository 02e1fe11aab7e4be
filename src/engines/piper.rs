//! Piper neural TTS.
//!
//! # Voice Directory Layout
//!
//! ```text
//! models/piper/
//! ├── en_US-lessac-medium.onnx
//! ├── en_US-lessac-medium.onnx.json
//! ├── en_GB-alba-medium.onnx
//! └── en_GB-alba-medium.onnx.json
//! ```
//!
//! Voices: <https://huggingface.co/rhasspy/piper-voices>

use std::path::{Path, PathBuf};

use crate::accent::Accent;
use crate::engines::process::{locate_binary, run_tool};
use crate::engines::{read_tool_output, scratch_dir, SynthesisParams, VoiceVariant};
use crate::error::SynthesisError;
use crate::{AudioBuffer, SynthesisEngine};

/// (accent, model name, style)
const VOICES: &[(Accent, &str, &str)] = &[
    (Accent::Us, "en_US-libritts_r-medium", "libritts"),
    (Accent::Us, "en_US-lessac-medium", "lessac"),
    (Accent::Us, "en_US-ryan-medium", "ryan"),
    (Accent::Uk, "en_GB-alba-medium", "alba"),
    (Accent::Uk, "en_GB-jenny_dioco-medium", "jenny"),
    (Accent::Uk, "en_GB-northern_english_male-medium", "northern"),
    (Accent::Au, "en_AU-davis-medium", "davis"),
    (Accent::In, "en_IN-google-medium", "google"),
];

pub struct PiperEngine {
    bin_path: PathBuf,
    voices_dir: PathBuf,
}

impl PiperEngine {
    pub fn new(bin_path: PathBuf, voices_dir: PathBuf) -> Self {
        Self {
            bin_path,
            voices_dir,
        }
    }

    fn model_path(&self, model: &str) -> PathBuf {
        self.voices_dir.join(format!("{model}.onnx"))
    }

    fn command_args(model: &Path, params: &SynthesisParams, out: &Path) -> Vec<String> {
        let length_scale = if params.speaking_rate > 0.0 {
            1.0 / params.speaking_rate
        } else {
            1.0
        };
        vec![
            "--model".to_string(),
            model.display().to_string(),
            "--output_file".to_string(),
            out.display().to_string(),
            "--length_scale".to_string(),
            format!("{length_scale:.3}"),
        ]
    }
}

impl SynthesisEngine for PiperEngine {
    fn name(&self) -> &'static str {
        "piper"
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
            .filter(|(_, model, _)| {
                let installed = self.model_path(model).is_file();
                if !installed {
                    log::warn!(
                        "Piper voice {model} not found in {}, skipping",
                        self.voices_dir.display()
                    );
                }
                installed
            })
            .map(|&(accent, model, style)| VoiceVariant::new(accent, style, model))
            .collect()
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<AudioBuffer, SynthesisError> {
        let model = self.model_path(&params.voice);
        if !model.is_file() {
            return Err(SynthesisError::UnsupportedVoice {
                engine: "piper",
                voice: params.voice.clone(),
            });
        }

        let scratch = scratch_dir()?;
        let out = scratch.path().join("piper.wav");
        let args = Self::command_args(&model, params, &out);
        run_tool(&self.bin_path, &args, Some(text))?;
        read_tool_output(&out)
    }
}
