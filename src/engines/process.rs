use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::{SynthesisError, TranscriptionError};

/// Failure to run an external tool.
#[derive(Debug)]
pub(crate) enum ToolError {
    NotFound(String),
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },
    Io(std::io::Error),
}

impl From<ToolError> for SynthesisError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(tool) => SynthesisError::ToolNotFound(tool),
            ToolError::Failed { tool, code, stderr } => {
                SynthesisError::ToolFailed { tool, code, stderr }
            }
            ToolError::Io(e) => SynthesisError::Io(e),
        }
    }
}

impl From<ToolError> for TranscriptionError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(tool) => TranscriptionError::ToolNotFound(tool),
            ToolError::Failed { tool, code, stderr } => {
                TranscriptionError::ToolFailed { tool, code, stderr }
            }
            ToolError::Io(e) => TranscriptionError::Io(e),
        }
    }
}

/// Run `bin` with `args`, optionally feeding `stdin`, and require a zero exit.
pub(crate) fn run_tool<I, S>(bin: &Path, args: I, stdin: Option<&str>) -> Result<Output, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(bin);
    command.args(args);
    run_command(command, stdin)
}

/// Run a prepared command; stdio is wired up here.
pub(crate) fn run_command(mut command: Command, stdin: Option<&str>) -> Result<Output, ToolError> {
    let tool = command.get_program().to_string_lossy().into_owned();
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    log::debug!("running {command:?}");

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::NotFound(tool.clone())
        } else {
            ToolError::Io(e)
        }
    })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        // Line-oriented readers (piper, espeak-ng) under-process a final line
        // that has no terminator.
        pipe.write_all(newline_terminated(input).as_bytes())
            .map_err(ToolError::Io)?;
    }

    let output = child.wait_with_output().map_err(ToolError::Io)?;
    if !output.status.success() {
        return Err(ToolError::Failed {
            tool,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

pub(crate) fn newline_terminated(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

/// Resolve a tool either as an explicit path or by searching `PATH`.
pub fn locate_binary(bin: &Path) -> Option<PathBuf> {
    if bin.components().count() > 1 || bin.is_absolute() {
        return bin.is_file().then(|| bin.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_trailing_newline_for_stdin() {
        assert_eq!(newline_terminated("bee"), "bee\n");
    }

    #[test]
    fn keeps_single_trailing_newline_for_stdin() {
        assert_eq!(newline_terminated("bee\n"), "bee\n");
    }

    #[test]
    fn missing_tool_is_not_found() {
        let err = run_tool(Path::new("alphabet-tts-no-such-tool"), ["--version"], None).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn locate_binary_misses_unknown_tools() {
        assert!(locate_binary(Path::new("alphabet-tts-no-such-tool")).is_none());
        assert!(locate_binary(Path::new("/no/such/dir/tool")).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_reports_exit_code() {
        if locate_binary(Path::new("sh")).is_none() {
            return;
        }
        let err = run_tool(Path::new("sh"), ["-c", "echo boom >&2; exit 3"], None).unwrap_err();
        match err {
            ToolError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn stdin_reaches_the_tool() {
        if locate_binary(Path::new("cat")).is_none() {
            return;
        }
        let output = run_tool(Path::new("cat"), Vec::<&str>::new(), Some("ay")).unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "ay\n");
    }
}
