//! Dataset generation: letters × accents × engine voices × variants.
//!
//! Each combination is synthesised once and written to
//! `<output_dir>/<LETTER>/<engine>_<accent>_<style>_<NN>_<letter>.wav`. A
//! failing combination is logged, counted and skipped. Clips already on disk
//! are kept unless `overwrite` is set, so an interrupted run can be resumed;
//! the records of an existing manifest are carried into the new one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::accent::Accent;
use crate::alphabet::Letter;
use crate::config::Settings;
use crate::dataset::{letter_dir, sanitize_token, ClipName};
use crate::engines::espeak::DEFAULT_PITCH;
use crate::engines::{SynthesisParams, VoiceVariant};
use crate::error::{PipelineError, SynthesisError};
use crate::report::{read_json_report, write_json_report};
use crate::SynthesisEngine;

pub const MANIFEST_FILE: &str = "generation_manifest.json";

/// Voices used per engine in test mode.
const TEST_MODE_VOICES: usize = 2;

/// Largest pitch offset applied to variants past the first.
const PITCH_JITTER: i16 = 8;

#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct GenerationOptions {
    #[builder(default = "PathBuf::from(\"outputs\")")]
    pub output_dir: PathBuf,
    #[builder(default = "Accent::ALL.to_vec()")]
    pub accents: Vec<Accent>,
    #[builder(default = "Letter::all().collect()")]
    pub letters: Vec<Letter>,
    /// Clips per (letter, voice) combination.
    #[builder(default = "1")]
    pub variants: u32,
    #[builder(default = "Settings::DEFAULT_SEED")]
    pub seed: u64,
    #[builder(default = "1.0")]
    pub speaking_rate: f32,
    /// Relative speaking-rate spread for variants past the first.
    #[builder(default = "0.1")]
    pub rate_jitter: f32,
    /// Clips longer than this many seconds are rejected.
    #[builder(default = "Settings::DEFAULT_MAX_DURATION")]
    pub max_duration: f64,
    #[builder(default)]
    pub overwrite: bool,
    /// Write the manifest after this many new records.
    #[builder(default = "25")]
    pub flush_every: usize,
    /// Defaults to `<output_dir>/generation_manifest.json`.
    #[builder(default, setter(strip_option))]
    pub manifest_path: Option<PathBuf>,
    /// Only the first two voices of each engine.
    #[builder(default)]
    pub test_mode: bool,
}

impl GenerationOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.variants == Some(0) {
            return Err("variants must be at least 1".to_string());
        }
        if self.flush_every == Some(0) {
            return Err("flush_every must be at least 1".to_string());
        }
        if let Some(rate) = self.speaking_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(format!("speaking_rate must be positive, got {rate}"));
            }
        }
        if let Some(jitter) = self.rate_jitter {
            if !(0.0..1.0).contains(&jitter) {
                return Err(format!("rate_jitter must be within 0..1, got {jitter}"));
            }
        }
        Ok(())
    }
}

impl GenerationOptions {
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join(MANIFEST_FILE))
    }
}

/// One written clip. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub engine: String,
    pub accent: Accent,
    pub style: String,
    pub voice: String,
    pub letter: Letter,
    pub variant_index: u32,
    pub output_path: PathBuf,
    pub text: String,
    pub params: SynthesisParams,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub timestamp: DateTime<Utc>,
}

/// A combination that produced no clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub engine: String,
    pub accent: Accent,
    pub style: String,
    pub letter: Letter,
    pub variant_index: u32,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Clips recorded in the manifest.
    pub total: usize,
    pub errors: usize,
    pub skipped: usize,
    /// Clips written per `<accent>_<style>`.
    pub by_voice: BTreeMap<String, usize>,
}

/// `total`, `records` and the per-engine `total`/`by_voice` span every run
/// that wrote into the manifest; the remaining counters cover the latest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationManifest {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub total: usize,
    /// Clips written by the latest run.
    #[serde(default)]
    pub written: usize,
    pub failed: usize,
    pub skipped: usize,
    pub by_engine: BTreeMap<String, EngineStats>,
    pub unavailable_engines: Vec<String>,
    pub records: Vec<GenerationRecord>,
    pub failures: Vec<GenerationFailure>,
}

impl GenerationManifest {
    fn new(seed: u64) -> Self {
        Self {
            generated_at: Utc::now(),
            seed,
            total: 0,
            written: 0,
            failed: 0,
            skipped: 0,
            by_engine: BTreeMap::new(),
            unavailable_engines: Vec::new(),
            records: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Start from the records of the manifest at `path`, if there is one.
    fn resume(path: &Path, seed: u64) -> Self {
        let mut manifest = Self::new(seed);
        if !path.is_file() {
            return manifest;
        }
        match read_json_report::<GenerationManifest>(path) {
            Ok(previous) => {
                log::info!(
                    "Resuming {} with {} existing records",
                    path.display(),
                    previous.records.len()
                );
                manifest.records = previous.records;
            }
            Err(e) => log::warn!("Ignoring unreadable manifest {}: {e}", path.display()),
        }
        manifest.tally();
        manifest
    }

    /// Add a record, replacing any earlier one for the same file.
    fn push_record(&mut self, record: GenerationRecord) {
        self.records.retain(|r| r.output_path != record.output_path);
        self.records.push(record);
        self.written += 1;
    }

    /// Recount the record-derived totals.
    fn tally(&mut self) {
        self.total = self.records.len();
        for stats in self.by_engine.values_mut() {
            stats.total = 0;
            stats.by_voice.clear();
        }
        for record in &self.records {
            let stats = self.by_engine.entry(record.engine.clone()).or_default();
            stats.total += 1;
            let voice_key = format!("{}_{}", record.accent.code(), record.style);
            *stats.by_voice.entry(voice_key).or_default() += 1;
        }
    }

    fn flush(&mut self, path: &Path) -> Result<(), PipelineError> {
        self.generated_at = Utc::now();
        self.tally();
        write_json_report(path, self)
    }
}

/// FNV-1a, stable across builds and platforms.
fn fnv1a(parts: &[&str]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for part in parts {
        for byte in part.bytes().chain(std::iter::once(0xff)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    hash
}

/// Seed for one combination, independent of iteration order.
pub fn combination_seed(
    seed: u64,
    engine: &str,
    voice: &VoiceVariant,
    letter: Letter,
    variant: u32,
) -> u64 {
    let letter = letter.as_char().to_string();
    let variant = variant.to_string();
    seed ^ fnv1a(&[engine, voice.accent.code(), &voice.style, &letter, &variant])
}

/// Synthesis parameters for a combination. Variant 1 uses the voice as-is;
/// later variants get a reproducible speaking-rate (and, where supported,
/// pitch) offset.
pub fn variant_params(
    voice: &VoiceVariant,
    variant: u32,
    combo_seed: u64,
    options: &GenerationOptions,
    supports_pitch: bool,
) -> SynthesisParams {
    let mut params = SynthesisParams::for_voice(voice, options.speaking_rate, combo_seed);
    if variant <= 1 {
        return params;
    }

    let mut rng = StdRng::seed_from_u64(combo_seed);
    if options.rate_jitter > 0.0 {
        let offset = rng.random_range(-options.rate_jitter..=options.rate_jitter);
        params.speaking_rate = options.speaking_rate * (1.0 + offset);
    }
    if supports_pitch {
        let base = i16::from(voice.pitch.unwrap_or(DEFAULT_PITCH));
        let pitch = (base + rng.random_range(-PITCH_JITTER..=PITCH_JITTER)).clamp(0, 99);
        params.pitch = u8::try_from(pitch).ok();
    }
    params
}

/// Run the full cross product and write the manifest.
///
/// Only manifest or directory write failures are returned as errors.
pub fn run_generation(
    engines: &mut [Box<dyn SynthesisEngine>],
    options: &GenerationOptions,
) -> Result<GenerationManifest, PipelineError> {
    let manifest_path = options.manifest_path();
    for &letter in &options.letters {
        std::fs::create_dir_all(letter_dir(&options.output_dir, letter))
            .map_err(|e| PipelineError::io("creating letter directory", e))?;
    }

    let mut manifest = GenerationManifest::resume(&manifest_path, options.seed);
    let mut since_flush = 0usize;

    for engine in engines.iter_mut() {
        let engine_name = engine.name();
        if let Err(e) = engine.check_available() {
            log::warn!("Skipping {engine_name}: {e}");
            manifest.unavailable_engines.push(engine_name.to_string());
            continue;
        }

        let mut voices = engine.voices(&options.accents);
        if options.test_mode {
            voices.truncate(TEST_MODE_VOICES);
        }
        if voices.is_empty() {
            log::warn!("{engine_name} offers no voices for the selected accents");
            continue;
        }
        log::info!(
            "{engine_name}: {} voices x {} letters x {} variants",
            voices.len(),
            options.letters.len(),
            options.variants
        );

        let supports_pitch = engine.supports_pitch();
        for voice in &voices {
            let style = sanitize_token(&voice.style);
            for &letter in &options.letters {
                let text = engine.text_for(letter, voice.accent);
                for variant in 1..=options.variants {
                    let clip = ClipName::new(engine_name, voice.accent.code(), style.clone(), variant, letter);
                    let path = clip.path_in(&options.output_dir);
                    let stats = manifest.by_engine.entry(engine_name.to_string()).or_default();

                    if path.exists() && !options.overwrite {
                        log::debug!("{} exists, skipping", path.display());
                        stats.skipped += 1;
                        manifest.skipped += 1;
                        continue;
                    }

                    let combo_seed = combination_seed(options.seed, engine_name, voice, letter, variant);
                    let params = variant_params(voice, variant, combo_seed, options, supports_pitch);

                    match synthesize_clip(engine.as_mut(), &text, &path, &params, options.max_duration) {
                        Ok((duration_seconds, sample_rate)) => {
                            log::info!("Wrote {} ({duration_seconds:.2}s)", path.display());
                            manifest.push_record(GenerationRecord {
                                engine: engine_name.to_string(),
                                accent: voice.accent,
                                style: style.clone(),
                                voice: voice.voice.clone(),
                                letter,
                                variant_index: variant,
                                output_path: path,
                                text: text.clone(),
                                params,
                                duration_seconds,
                                sample_rate,
                                timestamp: Utc::now(),
                            });
                            since_flush += 1;
                            if since_flush >= options.flush_every {
                                manifest.flush(&manifest_path)?;
                                since_flush = 0;
                            }
                        }
                        Err(e) => {
                            log::warn!("{}: {e}", clip.file_name());
                            stats.errors += 1;
                            manifest.failed += 1;
                            manifest.failures.push(GenerationFailure {
                                engine: engine_name.to_string(),
                                accent: voice.accent,
                                style: style.clone(),
                                letter,
                                variant_index: variant,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    manifest.flush(&manifest_path)?;
    log::info!(
        "Generation complete: {} written, {} failed, {} skipped. Manifest: {} ({} records)",
        manifest.written,
        manifest.failed,
        manifest.skipped,
        manifest_path.display(),
        manifest.total
    );
    Ok(manifest)
}

fn synthesize_clip(
    engine: &mut dyn SynthesisEngine,
    text: &str,
    path: &Path,
    params: &SynthesisParams,
    max_duration: f64,
) -> Result<(f64, u32), SynthesisError> {
    let audio = engine.synthesize(text, params)?;
    if audio.is_empty() {
        return Err(SynthesisError::EmptyAudio);
    }
    let duration = audio.duration_secs();
    if duration > max_duration {
        return Err(SynthesisError::TooLong {
            duration,
            max: max_duration,
        });
    }
    // Staged beside the target; a failed write leaves no partial clip.
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let staged = tempfile::Builder::new()
        .prefix(".clip-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    audio.write_wav(staged.path())?;
    staged.persist(path).map_err(|e| SynthesisError::Io(e.error))?;
    Ok((duration, audio.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AudioBuffer;

    /// Half-second tone per request; fails for Q, runs long for W.
    struct ToneEngine {
        calls: usize,
    }

    impl SynthesisEngine for ToneEngine {
        fn name(&self) -> &'static str {
            "tone"
        }

        fn check_available(&self) -> Result<(), SynthesisError> {
            Ok(())
        }

        fn voices(&self, accents: &[Accent]) -> Vec<VoiceVariant> {
            accents
                .iter()
                .flat_map(|&a| {
                    [
                        VoiceVariant::new(a, "Soft Voice", "soft"),
                        VoiceVariant::new(a, "loud", "loud"),
                        VoiceVariant::new(a, "third", "third"),
                    ]
                })
                .collect()
        }

        fn synthesize(
            &mut self,
            text: &str,
            _params: &SynthesisParams,
        ) -> Result<AudioBuffer, SynthesisError> {
            self.calls += 1;
            let seconds = match text {
                "queue" => return Err(SynthesisError::ToolNotFound("tone".into())),
                "double you" => 5.0,
                _ => 0.5,
            };
            Ok(AudioBuffer {
                samples: vec![0.25; (seconds * 8_000.0) as usize],
                sample_rate: 8_000,
            })
        }
    }

    struct Offline;

    impl SynthesisEngine for Offline {
        fn name(&self) -> &'static str {
            "offline"
        }

        fn check_available(&self) -> Result<(), SynthesisError> {
            Err(SynthesisError::ToolNotFound("offline".into()))
        }

        fn voices(&self, _accents: &[Accent]) -> Vec<VoiceVariant> {
            Vec::new()
        }

        fn synthesize(&mut self, _: &str, _: &SynthesisParams) -> Result<AudioBuffer, SynthesisError> {
            unreachable!("never available")
        }
    }

    fn options(dir: &Path, letters: &str) -> GenerationOptions {
        GenerationOptionsBuilder::default()
            .output_dir(dir)
            .accents(vec![Accent::Us])
            .letters(crate::alphabet::parse_letters(letters).unwrap())
            .variants(2u32)
            .flush_every(2usize)
            .build()
            .unwrap()
    }

    #[test]
    fn writes_clips_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), "AQW");
        let mut engines: Vec<Box<dyn SynthesisEngine>> =
            vec![Box::new(ToneEngine { calls: 0 }), Box::new(Offline)];

        let manifest = run_generation(&mut engines, &opts).unwrap();

        // 3 voices x 2 variants for A; Q fails, W is too long.
        assert_eq!(manifest.total, 6);
        assert_eq!(manifest.written, 6);
        assert_eq!(manifest.failed, 12);
        assert_eq!(manifest.unavailable_engines, vec!["offline".to_string()]);
        assert!(dir.path().join("A/tone_us_soft-voice_02_a.wav").is_file());
        assert!(!dir.path().join("W/tone_us_loud_01_w.wav").exists());
        assert!(manifest
            .failures
            .iter()
            .any(|f| f.letter == Letter::new('W').unwrap() && f.error.contains("longer")));

        let stats = &manifest.by_engine["tone"];
        assert_eq!(stats.total, 6);
        assert_eq!(stats.by_voice["us_loud"], 2);

        let written: serde_json::Value =
            crate::report::read_json_report(&dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(written["records"].as_array().unwrap().len(), 6);
        assert_eq!(written["records"][0]["accent"], "en-US");
    }

    #[test]
    fn rerun_skips_existing_clips() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), "B");
        let mut engines: Vec<Box<dyn SynthesisEngine>> = vec![Box::new(ToneEngine { calls: 0 })];
        run_generation(&mut engines, &opts).unwrap();

        let again = run_generation(&mut engines, &opts).unwrap();
        assert_eq!(again.written, 0);
        assert_eq!(again.skipped, 6);
        assert_eq!(again.total, 6);
    }

    #[test]
    fn resumed_run_keeps_earlier_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut engines: Vec<Box<dyn SynthesisEngine>> = vec![Box::new(ToneEngine { calls: 0 })];
        run_generation(&mut engines, &options(dir.path(), "AB")).unwrap();

        let resumed = run_generation(&mut engines, &options(dir.path(), "ABC")).unwrap();
        assert_eq!(resumed.written, 6);
        assert_eq!(resumed.skipped, 12);
        assert_eq!(resumed.total, 18);
        assert_eq!(resumed.by_engine["tone"].total, 18);
        assert_eq!(resumed.by_engine["tone"].by_voice["us_soft-voice"], 6);

        let on_disk: GenerationManifest =
            crate::report::read_json_report(&dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(on_disk.records.len(), 18);
        assert_eq!(on_disk.records[0].params.accent, Accent::Us);
    }

    #[test]
    fn overwrite_replaces_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), "D");
        let mut engines: Vec<Box<dyn SynthesisEngine>> = vec![Box::new(ToneEngine { calls: 0 })];
        run_generation(&mut engines, &opts).unwrap();

        opts.overwrite = true;
        let again = run_generation(&mut engines, &opts).unwrap();
        assert_eq!(again.written, 6);
        assert_eq!(again.total, 6);
    }

    #[test]
    fn failed_write_leaves_no_partial_clip() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), "E");
        opts.overwrite = true;
        opts.variants = 1;
        // A directory in place of the clip makes the final rename fail.
        let blocked = dir.path().join("E/tone_us_loud_01_e.wav");
        std::fs::create_dir_all(blocked.join("inner")).unwrap();

        let mut engines: Vec<Box<dyn SynthesisEngine>> = vec![Box::new(ToneEngine { calls: 0 })];
        let manifest = run_generation(&mut engines, &opts).unwrap();
        assert_eq!(manifest.written, 2);
        assert_eq!(manifest.failed, 1);
        assert!(blocked.is_dir());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("E"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_mode_limits_voices() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), "C");
        opts.test_mode = true;
        opts.variants = 1;
        let mut engines: Vec<Box<dyn SynthesisEngine>> = vec![Box::new(ToneEngine { calls: 0 })];
        let manifest = run_generation(&mut engines, &opts).unwrap();
        assert_eq!(manifest.total, 2);
    }

    #[test]
    fn variants_are_reproducible_and_distinct() {
        let opts = options(Path::new("o"), "A");
        let voice = VoiceVariant::new(Accent::Uk, "rp", "en-gb-x-rp").with_pitch(50);
        let letter = Letter::new('E').unwrap();

        let seed2 = combination_seed(opts.seed, "espeak", &voice, letter, 2);
        let seed3 = combination_seed(opts.seed, "espeak", &voice, letter, 3);
        assert_ne!(seed2, seed3);

        let first = variant_params(&voice, 1, seed2, &opts, true);
        assert_eq!(first.speaking_rate, 1.0);
        assert_eq!(first.pitch, Some(50));

        let a = variant_params(&voice, 2, seed2, &opts, true);
        let b = variant_params(&voice, 2, seed2, &opts, true);
        assert_eq!(a, b);
        assert!((a.speaking_rate - 1.0).abs() <= 0.1 + f32::EPSILON);
        assert!(a.pitch.is_some_and(|p| (42..=58).contains(&p)));

        let no_pitch = variant_params(&VoiceVariant::new(Accent::Us, "n", "com"), 2, seed2, &opts, false);
        assert_eq!(no_pitch.pitch, None);
    }

    #[test]
    fn builder_rejects_zero_variants() {
        assert!(GenerationOptionsBuilder::default().variants(0u32).build().is_err());
    }
}
