use std::path::PathBuf;
use std::time::Instant;

use alphabet_tts::{
    engines::{espeak::EspeakEngine, SynthesisParams},
    quality::{check_file, QualityThresholds},
    Accent, Letter, SynthesisEngine,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut engine = EspeakEngine::new(PathBuf::from("espeak-ng"));
    engine.check_available()?;

    let letter = Letter::parse(&std::env::args().nth(1).unwrap_or_else(|| "Z".to_string()))
        .ok_or("pass a single letter A-Z")?;

    let voices = engine.voices(&[Accent::Us, Accent::Uk]);
    println!("Available voices: {:?}", voices.iter().map(|v| &v.voice).collect::<Vec<_>>());

    for voice in &voices {
        let text = engine.text_for(letter, voice.accent);
        let params = SynthesisParams::for_voice(voice, 1.0, 0);
        let out = PathBuf::from(format!("espeak_{}_{}_{}.wav", voice.accent.code(), voice.style, letter.lowercase()));

        let start = Instant::now();
        let audio = engine.synthesize_to_file(&text, &out, &params)?;
        let quality = check_file(&out, &PathBuf::from("."), &QualityThresholds::default())?;
        println!(
            "{:<10} {:<12} \"{text}\" {:.2}s in {:.2?}, quality {:.0} {:?}",
            voice.accent,
            voice.style,
            audio.duration_secs(),
            start.elapsed(),
            quality.quality_score,
            quality.issues
        );
    }
    Ok(())
}
