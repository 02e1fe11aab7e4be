//! WAV decoding helpers shared by the engines, the transcriber and the
//! quality checker.

use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::AudioError;
use crate::AudioBuffer;

/// Format details of a decoded WAV file, before down-mixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub float: bool,
}

/// Decode a WAV file into mono `f32` samples in `[-1, 1]`.
pub fn read_wav(path: &Path) -> Result<(AudioBuffer, WavFormat), AudioError> {
    let reader = hound::WavReader::open(path)?;
    decode(reader)
}

/// Decode WAV bytes already held in memory.
pub fn read_wav_bytes(bytes: &[u8]) -> Result<(AudioBuffer, WavFormat), AudioError> {
    let reader = hound::WavReader::new(std::io::Cursor::new(bytes))?;
    decode(reader)
}

fn decode<R: Read>(mut reader: hound::WavReader<R>) -> Result<(AudioBuffer, WavFormat), AudioError> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AudioError::Unsupported("zero channels".to_string()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AudioError::Unsupported(format!(
                    "{}-bit integer samples",
                    spec.bits_per_sample
                )));
            }
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let format = WavFormat {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        float: spec.sample_format == hound::SampleFormat::Float,
    };

    Ok((
        AudioBuffer {
            samples: downmix(&interleaved, spec.channels as usize),
            sample_rate: spec.sample_rate,
        },
        format,
    ))
}

/// Duration in seconds read from the WAV header (frames / sample rate),
/// without decoding the samples.
pub fn probe_duration(path: &Path) -> Result<f64, AudioError> {
    let reader = hound::WavReader::open(path)?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return Err(AudioError::Unsupported("zero sample rate".to_string()));
    }
    Ok(reader.duration() as f64 / rate as f64)
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler. Good enough for feeding a speech
/// recogniser; not meant for listening material.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round().max(1.0) as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] * (1.0 - frac) + samples[next] * frac
        })
        .collect()
}
