//! Coqui XTTS v2 voice cloning.
//!
//! Each accent is cloned from a short reference clip produced by
//! [`references::build_references`](crate::references::build_references),
//! looked up as `<reference_dir>/<accent_name>_reference.wav`.
//!
//! The Coqui `tts` CLI loads the model on every call, so this backend is slow;
//! it is meant for small batches.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::accent::Accent;
use crate::alphabet::Letter;
use crate::config::Device;
use crate::engines::process::{locate_binary, run_command};
use crate::engines::{read_tool_output, scratch_dir, SynthesisParams, VoiceVariant};
use crate::error::SynthesisError;
use crate::references::reference_path;
use crate::{AudioBuffer, SynthesisEngine};

pub const MODEL_NAME: &str = "tts_models/multilingual/multi-dataset/xtts_v2";

pub struct XttsEngine {
    bin_path: PathBuf,
    reference_dir: PathBuf,
    device: Device,
}

impl XttsEngine {
    pub fn new(bin_path: PathBuf, reference_dir: PathBuf, device: Device) -> Self {
        Self {
            bin_path,
            reference_dir,
            device,
        }
    }

    fn command(&self, text: &str, reference: &Path, out: &Path) -> Command {
        let mut command = Command::new(&self.bin_path);
        command
            .arg("--model_name")
            .arg(MODEL_NAME)
            .arg("--text")
            .arg(text)
            .arg("--speaker_wav")
            .arg(reference)
            .arg("--language_idx")
            .arg("en")
            .arg("--out_path")
            .arg(out)
            // Skips the interactive licence prompt on first download.
            .env("COQUI_TOS_AGREED", "1");
        if self.device == Device::Cuda {
            command.arg("--use_cuda").arg("true");
        }
        command
    }
}

impl SynthesisEngine for XttsEngine {
    fn name(&self) -> &'static str {
        "xtts"
    }

    fn check_available(&self) -> Result<(), SynthesisError> {
        locate_binary(&self.bin_path)
            .map(|_| ())
            .ok_or_else(|| SynthesisError::ToolNotFound(self.bin_path.display().to_string()))
    }

    fn voices(&self, accents: &[Accent]) -> Vec<VoiceVariant> {
        accents
            .iter()
            .filter_map(|&accent| {
                let reference = reference_path(&self.reference_dir, accent);
                if reference.is_file() {
                    log::info!("Found reference: {} -> {}", accent, reference.display());
                    Some(
                        VoiceVariant::new(accent, "clone", accent.reference_name())
                            .with_reference(reference),
                    )
                } else {
                    log::warn!("Missing reference: {} -> {}", accent, reference.display());
                    None
                }
            })
            .collect()
    }

    /// XTTS reads a bare letter more reliably than a spelled-out name.
    fn text_for(&self, letter: Letter, _accent: Accent) -> String {
        letter.as_char().to_string()
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<AudioBuffer, SynthesisError> {
        let reference = params
            .reference_audio
            .clone()
            .unwrap_or_else(|| reference_path(&self.reference_dir, params.accent));
        if !reference.is_file() {
            return Err(SynthesisError::MissingReference(reference));
        }

        let scratch = scratch_dir()?;
        let out = scratch.path().join("xtts.wav");
        run_command(self.command(text, &reference, &out), None)?;
        read_tool_output(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voices_require_reference_clips() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("british_reference.wav"), b"RIFF").unwrap();
        let engine = XttsEngine::new(PathBuf::from("tts"), dir.path().to_path_buf(), Device::Cpu);

        let voices = engine.voices(&[Accent::Us, Accent::Uk]);
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].accent, Accent::Uk);
        assert_eq!(voices[0].style, "clone");
        assert_eq!(
            voices[0].reference_audio.as_deref(),
            Some(dir.path().join("british_reference.wav").as_path())
        );
    }

    #[test]
    fn speaks_the_bare_letter() {
        let engine = XttsEngine::new(PathBuf::from("tts"), PathBuf::new(), Device::Cpu);
        assert_eq!(engine.text_for(Letter::new('h').unwrap(), Accent::Au), "H");
    }

    #[test]
    fn cuda_adds_flag() {
        let engine = XttsEngine::new(PathBuf::from("tts"), PathBuf::new(), Device::Cuda);
        let command = engine.command("A", Path::new("r.wav"), Path::new("o.wav"));
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(args.ends_with(&["--use_cuda".to_string(), "true".to_string()]));
        assert!(args.contains(&"--speaker_wav".to_string()));
    }

    #[test]
    fn missing_reference_fails_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = XttsEngine::new(PathBuf::from("tts"), dir.path().to_path_buf(), Device::Cpu);
        let params = SynthesisParams {
            accent: Accent::Ie,
            voice: "irish".to_string(),
            speaking_rate: 1.0,
            pitch: None,
            seed: 0,
            slow: false,
            reference_audio: None,
        };
        let err = engine.synthesize("A", &params).unwrap_err();
        assert!(matches!(err, SynthesisError::MissingReference(_)));
    }
}
