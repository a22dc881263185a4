use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{MetricReadings, Sample};

/// One JSON line of the history file.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct StoredSample {
    pub(super) timestamp: DateTime<Utc>,
    #[serde(default)]
    pub(super) metrics: BTreeMap<String, Option<f64>>,
}

/// Flat layout written by older releases of the checker.
#[derive(Debug, Deserialize)]
pub(super) struct LegacyRecord {
    datetime: String,
    #[serde(default)]
    tempinfo: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    cpuinfo: Option<f64>,
    #[serde(default)]
    meminfo: Option<f64>,
    #[serde(default)]
    diskinfo: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum RecordLine {
    Current(StoredSample),
    Legacy(LegacyRecord),
}

impl From<&Sample> for StoredSample {
    fn from(sample: &Sample) -> Self {
        Self {
            timestamp: sample.timestamp,
            metrics: sample
                .metrics
                .iter()
                .map(|(name, value)| (name.clone(), Some(*value)))
                .collect(),
        }
    }
}

impl RecordLine {
    pub(super) fn into_sample(self) -> Result<Sample, String> {
        match self {
            RecordLine::Current(stored) => Ok(Sample::new(
                stored.timestamp,
                present_values(stored.metrics.into_iter()).collect(),
            )),
            RecordLine::Legacy(legacy) => legacy.into_sample(),
        }
    }
}

impl LegacyRecord {
    fn into_sample(self) -> Result<Sample, String> {
        let timestamp = parse_legacy_timestamp(&self.datetime)?;

        let mut metrics = MetricReadings::new();
        metrics.extend(present_values(
            self.tempinfo
                .into_iter()
                .map(|(package, value)| (format!("temp:Package id {}", package), value)),
        ));
        metrics.extend(present_values(
            self.diskinfo
                .into_iter()
                .map(|(mount, value)| (format!("disk:{}", mount), value)),
        ));
        if let Some(cpu) = self.cpuinfo.filter(|value| value.is_finite()) {
            metrics.insert("cpu".to_string(), cpu);
        }
        if let Some(mem) = self.meminfo.filter(|value| value.is_finite()) {
            metrics.insert("mem".to_string(), mem);
        }

        Ok(Sample::new(timestamp, metrics))
    }
}

fn present_values(
    values: impl Iterator<Item = (String, Option<f64>)>,
) -> impl Iterator<Item = (String, f64)> {
    values.filter_map(|(name, value)| {
        value
            .filter(|value| value.is_finite())
            .map(|value| (name, value))
    })
}

fn parse_legacy_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
        return Ok(aware.with_timezone(&Utc));
    }

    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|error| format!("invalid legacy datetime {:?}: {}", raw, error))
}
