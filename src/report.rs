//! JSON persistence shared by the manifest, validation and quality reports.

use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::PipelineError;

/// Write `value` as pretty JSON to `path`.
///
/// Parent directories are created. The file is written to a temporary
/// sibling and renamed into place, so readers never see a half-written
/// report.
pub fn write_json_report<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let report_err = |source: std::io::Error| PipelineError::Report {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(report_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(report_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| report_err(std::io::Error::from(e)))?;
        writer.write_all(b"\n").map_err(report_err)?;
        writer.flush().map_err(report_err)?;
    }
    tmp.persist(path).map_err(|e| report_err(e.error))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Read a JSON report written by [`write_json_report`].
pub fn read_json_report<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let file = std::fs::File::open(path).map_err(|e| PipelineError::io("opening report", e))?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
