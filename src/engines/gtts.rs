//! Google Translate TTS.
//!
//! The accent is selected through the Google domain (`translate.google.co.uk`
//! speaks British English, `.co.in` Indian English, ...). Responses are MP3,
//! converted to WAV with `ffmpeg`.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crate::accent::Accent;
use crate::engines::process::{locate_binary, run_tool};
use crate::engines::{read_tool_output, scratch_dir, SynthesisParams, VoiceVariant};
use crate::error::SynthesisError;
use crate::{AudioBuffer, SynthesisEngine};

/// Minimum spacing between requests to stay clear of rate limiting.
const REQUEST_INTERVAL: Duration = Duration::from_millis(300);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const OUTPUT_SAMPLE_RATE: u32 = 24_000;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) alphabet-tts";

/// Accents that also get a slow-speech style.
const SLOW_ACCENTS: &[Accent] = &[Accent::Us, Accent::Uk];

pub struct GttsEngine {
    client: reqwest::blocking::Client,
    ffmpeg_bin: PathBuf,
    last_request: Option<Instant>,
}

impl GttsEngine {
    pub fn new(ffmpeg_bin: PathBuf) -> Result<Self, SynthesisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            ffmpeg_bin,
            last_request: None,
        })
    }

    fn endpoint(tld: &str) -> String {
        format!("https://translate.google.{tld}/translate_tts")
    }

    fn throttle(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < REQUEST_INTERVAL {
                thread::sleep(REQUEST_INTERVAL - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }

    fn fetch_mp3(&mut self, text: &str, tld: &str, slow: bool) -> Result<Vec<u8>, SynthesisError> {
        self.throttle();
        let textlen = text.chars().count().to_string();
        let response = self
            .client
            .get(Self::endpoint(tld))
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", "en"),
                ("client", "tw-ob"),
                ("ttsspeed", if slow { "0.3" } else { "1" }),
                ("total", "1"),
                ("idx", "0"),
                ("textlen", textlen.as_str()),
            ])
            .send()?
            .error_for_status()?;
        let bytes = response.bytes()?;
        log::debug!("gTTS returned {} bytes from {tld}", bytes.len());
        Ok(bytes.to_vec())
    }
}

impl SynthesisEngine for GttsEngine {
    fn name(&self) -> &'static str {
        "gtts"
    }

    fn check_available(&self) -> Result<(), SynthesisError> {
        locate_binary(&self.ffmpeg_bin)
            .map(|_| ())
            .ok_or_else(|| SynthesisError::ToolNotFound(self.ffmpeg_bin.display().to_string()))
    }

    fn voices(&self, accents: &[Accent]) -> Vec<VoiceVariant> {
        let mut voices = Vec::new();
        for &accent in accents {
            voices.push(VoiceVariant::new(accent, "natural", accent.gtts_tld()));
            if SLOW_ACCENTS.contains(&accent) {
                voices.push(VoiceVariant::new(accent, "slow", accent.gtts_tld()).slow());
            }
        }
        voices
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<AudioBuffer, SynthesisError> {
        let mp3 = self.fetch_mp3(text, &params.voice, params.slow)?;
        if mp3.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        let scratch = scratch_dir()?;
        let mp3_path = scratch.path().join("gtts.mp3");
        let wav_path = scratch.path().join("gtts.wav");
        std::fs::write(&mp3_path, &mp3)?;

        let args = [
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            mp3_path.display().to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            OUTPUT_SAMPLE_RATE.to_string(),
            wav_path.display().to_string(),
        ];
        run_tool(&self.ffmpeg_bin, &args, None)?;
        read_tool_output(&wav_path)
    }
}
