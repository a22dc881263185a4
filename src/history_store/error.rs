use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("corrupt history {path} at line {line}: {reason}")]
    Corrupt {
        path: String,
        line: usize,
        reason: String,
    },
    #[error("sample at {attempted} is not after the last recorded sample at {last}")]
    OutOfOrderSample {
        last: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },
    #[error("reading {metric}={value} at {timestamp} is not a finite number")]
    NonFiniteReading {
        metric: String,
        value: f64,
        timestamp: DateTime<Utc>,
    },
    #[error("history io failure on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl HistoryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Corrupt { .. } => "HISTORY_CORRUPT",
            Self::OutOfOrderSample { .. } => "HISTORY_OUT_OF_ORDER",
            Self::NonFiniteReading { .. } => "HISTORY_NON_FINITE",
            Self::Io { .. } => "HISTORY_IO",
        }
    }
}
