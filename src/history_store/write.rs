use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::error::HistoryError;
use super::model::History;
use super::record::StoredSample;

/// Replaces the history file atomically: temp file in the same directory, fsync, rename.
pub(super) fn save_history(path: &Path, history: &History) -> Result<(), HistoryError> {
    let io_error = |source: std::io::Error| HistoryError::Io {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_error)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        for sample in history.samples() {
            serde_json::to_writer(&mut writer, &StoredSample::from(sample))
                .map_err(|error| io_error(std::io::Error::other(error)))?;
            writer.write_all(b"\n").map_err(io_error)?;
        }
        writer.flush().map_err(io_error)?;
    }
    temp.as_file().sync_all().map_err(io_error)?;
    temp.persist(path).map_err(|error| io_error(error.error))?;

    Ok(())
}
