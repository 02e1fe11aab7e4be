//! `alphabet-tts` command line: build reference clips, generate the letter
//! dataset, validate it with whisper.cpp and check signal quality.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use alphabet_tts::alphabet::parse_letters;
use alphabet_tts::config::Device;
use alphabet_tts::engines::{build_engine, EngineKind};
use alphabet_tts::generate::{run_generation, GenerationOptionsBuilder};
use alphabet_tts::quality::{self, QualityThresholds};
use alphabet_tts::references::{build_references, verify_references};
use alphabet_tts::report::write_json_report;
use alphabet_tts::transcription::WhisperCppEngine;
use alphabet_tts::validate::{self, ValidationOptionsBuilder};
use alphabet_tts::{Accent, ModelSize, Settings, SynthesisEngine, TranscriptionEngine};

#[derive(Debug, Parser)]
#[command(name = "alphabet-tts")]
#[command(about = "Generate and validate spoken A-Z letter clips")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Synthesize one voice-cloning reference clip per accent
    References(ReferencesArgs),
    /// Generate letter clips for every engine, accent and variant
    Generate(GenerateArgs),
    /// Transcribe clips and check they name the right letter
    Validate(ValidateArgs),
    /// Check duration, loudness, silence and clipping of every clip
    Quality(QualityArgs),
    /// Report which synthesis backends are usable on this machine
    Engines,
}

#[derive(Debug, Args)]
struct ReferencesArgs {
    #[arg(long)]
    reference_dir: Option<PathBuf>,
    /// Comma-separated accents (en-US, uk, british, ...); all when omitted
    #[arg(long, value_delimiter = ',')]
    accents: Vec<Accent>,
    #[arg(long, value_enum, default_value_t = EngineKind::Gtts)]
    engine: EngineKind,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long, value_enum, value_delimiter = ',')]
    engines: Vec<EngineKind>,
    #[arg(long, value_delimiter = ',')]
    accents: Vec<Accent>,
    /// Letters to generate, e.g. `ABC`; all when omitted
    #[arg(long)]
    letters: Option<String>,
    #[arg(long, default_value_t = 1)]
    variants: u32,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 1.0)]
    speaking_rate: f32,
    #[arg(long)]
    overwrite: bool,
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Only the first two voices of each engine
    #[arg(long)]
    test_mode: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Validate at most this many files per letter
    #[arg(long)]
    max_files: Option<usize>,
    /// Validate each file with this probability (0..=1)
    #[arg(long)]
    sample_rate: Option<f64>,
    #[arg(long, value_enum, default_value_t = ModelSize::Base)]
    model_size: ModelSize,
    #[arg(long, default_value = validate::DEFAULT_REPORT_PATH)]
    report: PathBuf,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, value_enum)]
    device: Option<Device>,
}

#[derive(Debug, Args)]
struct QualityArgs {
    output_dir: Option<PathBuf>,
    #[arg(long, default_value = quality::DEFAULT_REPORT_PATH)]
    report: PathBuf,
    #[arg(long)]
    min_duration: Option<f64>,
    #[arg(long)]
    max_duration: Option<f64>,
    /// Exit with status 2 when any clip has issues
    #[arg(long)]
    strict: bool,
}

fn accents_or_all(accents: Vec<Accent>) -> Vec<Accent> {
    if accents.is_empty() {
        Accent::ALL.to_vec()
    } else {
        accents
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .init();

    match cli.command {
        Command::References(args) => run_references(&settings, args),
        Command::Generate(args) => run_generate(&settings, args),
        Command::Validate(args) => run_validate(&settings, args),
        Command::Quality(args) => run_quality(&settings, args),
        Command::Engines => run_engines(&settings),
    }
}

fn run_references(settings: &Settings, args: ReferencesArgs) -> anyhow::Result<()> {
    let dir = args.reference_dir.unwrap_or_else(|| settings.reference_dir.clone());
    let accents = accents_or_all(args.accents);
    let mut engine = build_engine(args.engine, settings)?;
    engine
        .check_available()
        .with_context(|| format!("{} is not available", engine.name()))?;

    build_references(engine.as_mut(), &dir, &accents)?;
    let (found, missing) = verify_references(&dir, &accents);
    for (accent, path) in &found {
        println!("  ok       {:<14} {}", accent.display_name(), path.display());
    }
    for accent in &missing {
        println!("  missing  {}", accent.display_name());
    }
    Ok(())
}

fn run_generate(settings: &Settings, args: GenerateArgs) -> anyhow::Result<()> {
    let kinds = if args.engines.is_empty() {
        EngineKind::ALL.to_vec()
    } else {
        args.engines
    };
    let mut engines: Vec<Box<dyn SynthesisEngine>> = Vec::new();
    for kind in kinds {
        match build_engine(kind, settings) {
            Ok(engine) => engines.push(engine),
            Err(e) => log::warn!("Skipping {kind}: {e}"),
        }
    }
    if engines.is_empty() {
        bail!("no synthesis engine could be constructed");
    }

    let mut builder = GenerationOptionsBuilder::default();
    builder
        .output_dir(args.output_dir.unwrap_or_else(|| settings.output_dir.clone()))
        .accents(accents_or_all(args.accents))
        .variants(args.variants)
        .seed(args.seed.unwrap_or(settings.seed))
        .speaking_rate(args.speaking_rate)
        .max_duration(settings.max_duration)
        .overwrite(args.overwrite)
        .test_mode(args.test_mode);
    if let Some(letters) = args.letters {
        builder.letters(parse_letters(&letters).map_err(anyhow::Error::msg)?);
    }
    if let Some(manifest) = args.manifest {
        builder.manifest_path(manifest);
    }
    let options = builder.build()?;

    let manifest = run_generation(&mut engines, &options)?;
    println!(
        "{} clips written, {} failed, {} skipped, {} in manifest",
        manifest.written, manifest.failed, manifest.skipped, manifest.total
    );
    for (engine, stats) in &manifest.by_engine {
        println!("  {engine:<8} {:>5} clips {:>5} errors", stats.total, stats.errors);
    }
    Ok(())
}

fn run_validate(settings: &Settings, args: ValidateArgs) -> anyhow::Result<()> {
    let mut builder = ValidationOptionsBuilder::default();
    builder
        .output_dir(args.output_dir.unwrap_or_else(|| settings.output_dir.clone()))
        .model_size(args.model_size)
        .report_path(args.report);
    if let Some(n) = args.max_files {
        builder.max_files(n);
    }
    if let Some(rate) = args.sample_rate {
        builder.sample_rate(rate);
    }
    if let Some(seed) = args.seed {
        builder.seed(seed);
    }
    let options = builder.build()?;

    let mut whisper = WhisperCppEngine::new(&settings.whisper_models_dir())
        .with_binary(settings.whisper_bin.clone())
        .with_device(args.device.unwrap_or(settings.device));
    whisper.load_model(options.model_size)?;
    let report = validate::validate_directory(&mut whisper, &options);
    whisper.unload_model();
    let report = report?;

    let s = &report.summary;
    println!(
        "{}/{} matched ({:.1}%), average score {:.1}, report: {}",
        s.matched,
        s.total_files,
        s.match_rate,
        s.average_validation_score,
        options.report_path.display()
    );
    for (letter, stats) in &report.letter_breakdown {
        println!("  {letter}: {}/{} ({:.0}%)", stats.matched, stats.total, stats.match_rate);
    }
    Ok(())
}

fn run_quality(settings: &Settings, args: QualityArgs) -> anyhow::Result<()> {
    let root = args.output_dir.unwrap_or_else(|| settings.output_dir.clone());
    let mut thresholds = QualityThresholds::default();
    if let Some(min) = args.min_duration {
        thresholds.min_duration = min;
    }
    if let Some(max) = args.max_duration {
        thresholds.max_duration = max;
    }

    let report = quality::check_directory(&root, &thresholds)?;
    write_json_report(&args.report, &report)?;

    let s = &report.summary;
    println!(
        "{}/{} clean ({:.1}%), average score {:.1}, report: {}",
        s.clean_files,
        s.total_files,
        s.quality_rate,
        s.average_quality_score,
        args.report.display()
    );
    for (issue, count) in &s.issues_by_type {
        println!("  {issue}: {count}");
    }
    if args.strict && report.has_issues() {
        std::process::exit(2);
    }
    Ok(())
}

fn run_engines(settings: &Settings) -> anyhow::Result<()> {
    for kind in EngineKind::ALL {
        let status = build_engine(kind, settings).and_then(|engine| {
            engine.check_available()?;
            Ok(engine.voices(&Accent::ALL).len())
        });
        match status {
            Ok(voices) => println!("  {kind:<8} available ({voices} voices)"),
            Err(e) => println!("  {kind:<8} unavailable: {e}"),
        }
    }
    let whisper = settings.whisper_bin.display().to_string();
    match alphabet_tts::engines::locate_binary(&settings.whisper_bin) {
        Some(path) => println!("  whisper  {}", path.display()),
        None => println!("  whisper  unavailable: `{whisper}` not found"),
    }
    Ok(())
}
