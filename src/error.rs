use std::path::PathBuf;

/// Failure while reading, writing or converting WAV audio.
#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported WAV format: {0}")]
    Unsupported(String),
    #[error("Audio contains no samples")]
    Empty,
}

/// Failure of a single synthesis request. Recovered per combination by the
/// generation orchestrator.
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("`{0}` not found. Install it or point the matching ALPHABET_*_BIN variable at it.")]
    ToolNotFound(String),
    #[error("`{tool}` exited with code {code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },
    #[cfg(feature = "gtts")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Voice '{voice}' is not supported by the {engine} engine")]
    UnsupportedVoice { engine: &'static str, voice: String },
    #[error("Reference audio not found at {}", .0.display())]
    MissingReference(PathBuf),
    #[error("Engine produced no audio")]
    EmptyAudio,
    #[error("Clip is {duration:.2}s, longer than the {max:.2}s limit")]
    TooLong { duration: f64, max: f64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Failure of the speech recognition collaborator for one file. The
/// validation engine records it as `transcription_failed` and moves on.
#[derive(thiserror::Error, Debug)]
pub enum TranscriptionError {
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Model file not found at {}", .0.display())]
    ModelNotFound(PathBuf),
    #[error("`{0}` not found. Install whisper.cpp or set ALPHABET_WHISPER_BIN.")]
    ToolNotFound(String),
    #[error("`{tool}` exited with code {code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Could not decode audio: {0}")]
    Decode(#[from] AudioError),
    #[error("Unexpected transcriber output: {0}")]
    Output(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Environment-level failure that aborts a whole run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("Failed to write report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
