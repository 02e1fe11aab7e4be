use std::path::Path;

use alphabet_tts::quality::{check_directory, QualityIssue, QualityThresholds};
use alphabet_tts::report::{read_json_report, write_json_report};
use alphabet_tts::{AudioBuffer, PipelineError};

fn write(root: &Path, rel: &str, samples: Vec<f32>, sample_rate: u32) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    AudioBuffer {
        samples,
        sample_rate,
    }
    .write_wav(&path)
    .unwrap();
}

fn tone(seconds: f32, rate: u32, amplitude: f32) -> Vec<f32> {
    let n = (seconds * rate as f32) as usize;
    (0..n)
        .map(|i| amplitude * (i as f32 * 0.07).sin())
        .collect()
}

#[test]
fn flags_each_kind_of_bad_clip() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "A/gtts_us_natural_01_a.wav", tone(1.0, 22_050, 0.4), 22_050);
    write(root, "A/gtts_us_natural_02_a.wav", tone(0.1, 22_050, 0.4), 22_050);
    write(root, "B/piper_us_lessac_01_b.wav", vec![0.0; 16_000], 16_000);
    write(root, "C/espeak_uk_rp_01_c.wav", tone(1.0, 16_000, 1.5), 16_000);
    std::fs::write(root.join("C/broken_us_x_02_c.wav"), b"RIFF....").unwrap();

    let report = check_directory(root, &QualityThresholds::default()).unwrap();
    let s = &report.summary;

    assert_eq!(s.total_files, 4);
    assert_eq!(s.clean_files, 1);
    assert_eq!(s.files_with_issues, 3);
    assert_eq!(s.unreadable_files, 1);
    assert_eq!(report.unreadable_files.len(), 1);
    assert!(report.has_issues());
    assert_eq!(s.quality_rate, 25.0);
    assert_eq!(s.sample_rates.iter().copied().collect::<Vec<_>>(), vec![16_000, 22_050]);

    let by_name = |suffix: &str| {
        report
            .results
            .iter()
            .find(|r| r.relative_path.ends_with(suffix))
            .unwrap()
    };
    assert!(by_name("01_a.wav").passed);
    assert_eq!(by_name("02_a.wav").issues, vec![QualityIssue::TooShort]);
    assert!(by_name("01_b.wav").issues.contains(&QualityIssue::MostlySilent));
    assert!(by_name("01_c.wav").issues.contains(&QualityIssue::Clipping));
    assert_eq!(by_name("01_c.wav").style.as_deref(), Some("rp"));
    assert_eq!(s.issues_by_type.get(&QualityIssue::TooQuiet), Some(&1));
}

#[test]
fn report_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("outputs");
    write(&root, "Z/gtts_uk_natural_01_z.wav", tone(0.8, 24_000, 0.3), 24_000);

    let report = check_directory(&root, &QualityThresholds::default()).unwrap();
    let path = dir.path().join("audio_quality_report.json");
    write_json_report(&path, &report).unwrap();

    let json: serde_json::Value = read_json_report(&path).unwrap();
    assert_eq!(json["summary"]["total_files"], 1);
    assert_eq!(json["results"][0]["letter"], "Z");
    assert_eq!(json["results"][0]["passed"], true);
    assert_eq!(json["results"][0]["duration_ok"], true);
    assert!(json["results"][0]["rms"].as_f64().unwrap() > 0.1);
}

#[test]
fn missing_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = check_directory(&dir.path().join("nope"), &QualityThresholds::default()).unwrap_err();
    assert!(matches!(err, PipelineError::MissingDirectory(_)));
}
