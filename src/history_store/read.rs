use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::error::HistoryError;
use super::model::History;
use super::record::RecordLine;

/// Reads the whole history file. A missing file is an empty history.
pub(super) fn load_history(path: &Path) -> Result<History, HistoryError> {
    let path_str = path.display().to_string();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(History::new()),
        Err(error) if error.kind() == ErrorKind::InvalidData => {
            return Err(HistoryError::Corrupt {
                path: path_str,
                line: 0,
                reason: format!("not valid utf-8: {}", error),
            });
        }
        Err(source) => {
            return Err(HistoryError::Io {
                path: path_str,
                source,
            });
        }
    };

    let mut history = History::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let corrupt = |reason: String| HistoryError::Corrupt {
            path: path_str.clone(),
            line: line_no,
            reason,
        };

        let record = serde_json::from_str::<RecordLine>(line)
            .map_err(|error| corrupt(format!("unparsable record: {}", error)))?;
        let sample = record.into_sample().map_err(corrupt)?;
        history
            .append(sample)
            .map_err(|error| corrupt(error.to_string()))?;
    }

    Ok(history)
}
