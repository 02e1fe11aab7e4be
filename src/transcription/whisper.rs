use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::Transcription;
use crate::audio::{read_wav, resample_linear};
use crate::config::{Device, ModelSize};
use crate::engines::process::{locate_binary, run_tool};
use crate::error::{AudioError, TranscriptionError};
use crate::{AudioBuffer, TranscriptionEngine};

/// whisper.cpp only accepts 16 kHz input.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

const DEFAULT_BEAM_SIZE: u32 = 5;

#[derive(Debug, Clone)]
struct LoadedModel {
    size: ModelSize,
    path: PathBuf,
}

/// whisper.cpp transcriber driven through `whisper-cli`.
///
/// ```rust,no_run
/// use std::path::Path;
/// use alphabet_tts::{transcription::WhisperCppEngine, ModelSize, TranscriptionEngine};
///
/// let mut whisper = WhisperCppEngine::new(Path::new("models/whisper"));
/// whisper.load_model(ModelSize::Tiny)?;
/// let heard = whisper.transcribe(Path::new("outputs/A/gtts_us_natural_01_a.wav"))?;
/// println!("{} ({:.2})", heard.text, heard.confidence);
/// whisper.unload_model();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct WhisperCppEngine {
    bin_path: PathBuf,
    models_dir: PathBuf,
    device: Device,
    language: String,
    beam_size: u32,
    threads: Option<usize>,
    model: Option<LoadedModel>,
}

impl WhisperCppEngine {
    /// Create a transcriber that uses `whisper-cli` from PATH.
    pub fn new(models_dir: &Path) -> Self {
        Self {
            bin_path: PathBuf::from("whisper-cli"),
            models_dir: models_dir.to_path_buf(),
            device: Device::Cpu,
            language: "en".to_string(),
            beam_size: DEFAULT_BEAM_SIZE,
            threads: None,
            model: None,
        }
    }

    pub fn with_binary(mut self, bin_path: PathBuf) -> Self {
        self.bin_path = bin_path;
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Size of the loaded model, if any.
    pub fn model_size(&self) -> Option<ModelSize> {
        self.model.as_ref().map(|m| m.size)
    }

    fn find_model(&self, size: ModelSize) -> Result<PathBuf, TranscriptionError> {
        size.ggml_candidates()
            .iter()
            .map(|name| self.models_dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                TranscriptionError::ModelNotFound(self.models_dir.join(size.ggml_candidates()[0]))
            })
    }

    fn command_args(&self, model: &Path, input: &Path, output_prefix: &Path) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            model.display().to_string(),
            "-f".to_string(),
            input.display().to_string(),
            "-l".to_string(),
            self.language.clone(),
            "-bs".to_string(),
            self.beam_size.to_string(),
            "-nt".to_string(),
            "-np".to_string(),
            "-ojf".to_string(),
            "-of".to_string(),
            output_prefix.display().to_string(),
        ];
        if self.device == Device::Cpu {
            args.push("-ng".to_string());
        }
        if let Some(threads) = self.threads {
            args.push("-t".to_string());
            args.push(threads.to_string());
        }
        args
    }
}

impl Drop for WhisperCppEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl TranscriptionEngine for WhisperCppEngine {
    fn load_model(&mut self, size: ModelSize) -> Result<(), TranscriptionError> {
        if locate_binary(&self.bin_path).is_none() {
            return Err(TranscriptionError::ToolNotFound(
                self.bin_path.display().to_string(),
            ));
        }
        let path = self.find_model(size)?;
        log::info!(
            "Loading whisper.cpp model ({size}) from {} on {}",
            path.display(),
            self.device.as_str()
        );
        self.model = Some(LoadedModel { size, path });
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
    }

    fn transcribe(&mut self, audio_path: &Path) -> Result<Transcription, TranscriptionError> {
        let model = self
            .model
            .as_ref()
            .ok_or(TranscriptionError::ModelNotLoaded)?;

        let (audio, _) = read_wav(audio_path)?;
        if audio.is_empty() {
            return Err(TranscriptionError::Decode(AudioError::Empty));
        }

        let scratch = tempfile::Builder::new().prefix("alphabet-asr-").tempdir()?;
        let input = scratch.path().join("input.wav");
        AudioBuffer {
            samples: resample_linear(&audio.samples, audio.sample_rate, WHISPER_SAMPLE_RATE),
            sample_rate: WHISPER_SAMPLE_RATE,
        }
        .write_wav(&input)?;

        let prefix = scratch.path().join("transcript");
        let args = self.command_args(&model.path, &input, &prefix);
        run_tool(&self.bin_path, &args, None)?;

        let json = std::fs::read_to_string(prefix.with_extension("json"))?;
        parse_whisper_json(&json)
    }

    fn describe(&self) -> String {
        match &self.model {
            Some(model) => format!("whisper.cpp {} ({})", model.size, model.path.display()),
            None => "whisper.cpp (no model loaded)".to_string(),
        }
    }

    fn device(&self) -> Option<Device> {
        Some(self.device)
    }
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    text: String,
    #[serde(default)]
    tokens: Vec<WhisperToken>,
}

#[derive(Debug, Deserialize)]
struct WhisperToken {
    text: String,
    p: f32,
}

/// Parse `whisper-cli --output-json-full` output.
///
/// Confidence is the mean probability of the non-special tokens. Non-speech
/// annotations such as `[BLANK_AUDIO]` or `(wind blowing)` are dropped from
/// the text.
pub fn parse_whisper_json(json: &str) -> Result<Transcription, TranscriptionError> {
    let output: WhisperOutput =
        serde_json::from_str(json).map_err(|e| TranscriptionError::Output(e.to_string()))?;

    let text = output
        .transcription
        .iter()
        .map(|segment| strip_annotations(&segment.text))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let probabilities: Vec<f32> = output
        .transcription
        .iter()
        .flat_map(|segment| segment.tokens.iter())
        .filter(|token| {
            let t = token.text.trim();
            !t.is_empty() && !t.starts_with("[_")
        })
        .map(|token| token.p)
        .collect();
    let confidence = if text.is_empty() || probabilities.is_empty() {
        0.0
    } else {
        probabilities.iter().sum::<f32>() / probabilities.len() as f32
    };

    Ok(Transcription::new(text, confidence))
}

fn strip_annotations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_JSON: &str = r#"{
        "systeminfo": "AVX = 1",
        "model": {"type": "base"},
        "transcription": [
            {
                "timestamps": {"from": "00:00:00,000", "to": "00:00:01,000"},
                "offsets": {"from": 0, "to": 1000},
                "text": " Bee.",
                "tokens": [
                    {"text": "[_BEG_]", "p": 0.1},
                    {"text": " Bee", "p": 0.9},
                    {"text": ".", "p": 0.7},
                    {"text": "[_TT_50]", "p": 0.2}
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_text_and_mean_token_probability() {
        let t = parse_whisper_json(FULL_JSON).unwrap();
        assert_eq!(t.text, "Bee.");
        assert!((t.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn blank_audio_is_empty_text() {
        let json = r#"{"transcription": [{"text": " [BLANK_AUDIO]", "tokens": [{"text": "[BLANK_AUDIO]", "p": 0.95}]}]}"#;
        let t = parse_whisper_json(json).unwrap();
        assert_eq!(t.text, "");
        assert_eq!(t.confidence, 0.0);
    }

    #[test]
    fn no_segments_is_empty_text() {
        let t = parse_whisper_json(r#"{"transcription": []}"#).unwrap();
        assert_eq!(t, Transcription::new("", 0.0));
    }

    #[test]
    fn malformed_output_is_an_error() {
        let err = parse_whisper_json("not json").unwrap_err();
        assert!(matches!(err, TranscriptionError::Output(_)));
    }

    #[test]
    fn strips_nested_annotations() {
        assert_eq!(strip_annotations(" (music [soft]) Ay! "), "Ay!");
    }

    #[test]
    fn transcribe_requires_loaded_model() {
        let mut engine = WhisperCppEngine::new(Path::new("models/whisper"));
        let err = engine.transcribe(Path::new("a.wav")).unwrap_err();
        assert!(matches!(err, TranscriptionError::ModelNotLoaded));
    }

    #[test]
    fn cpu_disables_gpu() {
        let engine = WhisperCppEngine::new(Path::new("m")).with_threads(2);
        let args = engine.command_args(Path::new("m.bin"), Path::new("in.wav"), Path::new("out"));
        assert!(args.contains(&"-ng".to_string()));
        assert_eq!(&args[args.len() - 2..], &["-t".to_string(), "2".to_string()]);
        let cuda = WhisperCppEngine::new(Path::new("m")).with_device(Device::Cuda);
        let args = cuda.command_args(Path::new("m.bin"), Path::new("in.wav"), Path::new("out"));
        assert!(!args.contains(&"-ng".to_string()));
        assert_eq!(cuda.device(), Some(Device::Cuda));
        assert_eq!(engine.device(), Some(Device::Cpu));
    }

    #[test]
    fn missing_model_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let engine = WhisperCppEngine::new(dir.path());
        let err = engine.find_model(ModelSize::Small).unwrap_err();
        match err {
            TranscriptionError::ModelNotFound(path) => {
                assert_eq!(path, dir.path().join("ggml-small.en.bin"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
