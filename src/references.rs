//! Reference clips used to condition voice cloning, one per accent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::accent::Accent;
use crate::engines::SynthesisParams;
use crate::error::PipelineError;
use crate::SynthesisEngine;

/// Roughly six to ten seconds of speech in most voices.
pub const REFERENCE_TEXT: &str = "The quick brown fox jumps over the lazy dog. \
                                  This is a reference sample for voice cloning.";

/// `<dir>/<accent_name>_reference.wav`
pub fn reference_path(dir: &Path, accent: Accent) -> PathBuf {
    dir.join(format!("{}_reference.wav", accent.reference_name()))
}

/// Synthesize one reference clip per accent with `engine`.
///
/// Accents the engine can't voice, or whose synthesis fails, are logged and
/// left out of the returned map. Only failing to create `dir` is fatal.
pub fn build_references(
    engine: &mut dyn SynthesisEngine,
    dir: &Path,
    accents: &[Accent],
) -> Result<BTreeMap<Accent, PathBuf>, PipelineError> {
    std::fs::create_dir_all(dir).map_err(|e| PipelineError::io("creating reference directory", e))?;
    log::info!(
        "Generating {} reference samples with {} into {}",
        accents.len(),
        engine.name(),
        dir.display()
    );

    let mut written = BTreeMap::new();
    for &accent in accents {
        let Some(voice) = engine.voices(&[accent]).into_iter().next() else {
            log::warn!("{} has no voice for {}, skipping", engine.name(), accent.display_name());
            continue;
        };

        let path = reference_path(dir, accent);
        let params = SynthesisParams::for_voice(&voice, 1.0, 0);
        match engine.synthesize_to_file(REFERENCE_TEXT, &path, &params) {
            Ok(audio) => {
                log::info!(
                    "Created {} ({:.1}s, {})",
                    path.display(),
                    audio.duration_secs(),
                    accent.display_name()
                );
                written.insert(accent, path);
            }
            Err(e) => log::error!("Error creating {} reference: {e}", accent.reference_name()),
        }
    }

    log::info!("{}/{} reference samples written", written.len(), accents.len());
    Ok(written)
}

/// Split `accents` into those with a reference clip on disk and those without.
pub fn verify_references(dir: &Path, accents: &[Accent]) -> (Vec<(Accent, PathBuf)>, Vec<Accent>) {
    let mut found = Vec::new();
    let mut missing = Vec::new();
    for &accent in accents {
        let path = reference_path(dir, accent);
        if path.is_file() {
            found.push((accent, path));
        } else {
            missing.push(accent);
        }
    }
    (found, missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::VoiceVariant;
    use crate::error::SynthesisError;
    use crate::AudioBuffer;

    /// Voices every accent except Irish; fails for Indian.
    struct ToneEngine;

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
                .filter(|a| **a != Accent::Ie)
                .map(|&a| VoiceVariant::new(a, "tone", a.code()))
                .collect()
        }

        fn synthesize(
            &mut self,
            _text: &str,
            params: &SynthesisParams,
        ) -> Result<AudioBuffer, SynthesisError> {
            if params.accent == Accent::In {
                return Err(SynthesisError::EmptyAudio);
            }
            Ok(AudioBuffer {
                samples: vec![0.1; 1600],
                sample_rate: 16_000,
            })
        }
    }

    #[test]
    fn reference_paths_use_accent_names() {
        assert_eq!(
            reference_path(Path::new("refs"), Accent::Za),
            PathBuf::from("refs/south_african_reference.wav")
        );
    }

    #[test]
    fn builds_what_it_can_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let refs = dir.path().join("references");
        let written = build_references(
            &mut ToneEngine,
            &refs,
            &[Accent::Us, Accent::In, Accent::Ie, Accent::Uk],
        )
        .unwrap();

        assert_eq!(written.keys().copied().collect::<Vec<_>>(), vec![Accent::Us, Accent::Uk]);
        assert!(refs.join("american_reference.wav").is_file());
        assert!(!refs.join("indian_reference.wav").exists());

        let (found, missing) = verify_references(&refs, &[Accent::Us, Accent::Ie]);
        assert_eq!(found.len(), 1);
        assert_eq!(missing, vec![Accent::Ie]);
    }
}
