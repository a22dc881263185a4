mod error;
mod lock;
mod model;
mod read;
mod record;
mod write;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::Config;

pub use error::HistoryError;
pub use lock::{LockError, RunLock};
pub use model::{History, MetricReadings, Sample};

/// Durable home of the sample history. All history file I/O goes through here.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.history.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<History, HistoryError> {
        read::load_history(&self.path)
    }

    pub fn save(&self, history: &History) -> Result<(), HistoryError> {
        write::save_history(&self.path, history)
    }

    /// Moves an unreadable history file aside so the next save does not destroy it.
    pub fn quarantine(&self, now: DateTime<Utc>) -> Result<PathBuf, HistoryError> {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{}", now.format("%Y%m%dT%H%M%SZ")));
        let target = PathBuf::from(name);

        std::fs::rename(&self.path, &target).map_err(|source| HistoryError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(target)
    }
}
