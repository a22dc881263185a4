use std::collections::BTreeMap;

use crate::config::Config;
use crate::history_store::History;
use crate::monitor::{ThresholdRule, CPU_METRIC, DISK_FAMILY, MEMORY_METRIC, TEMPERATURE_FAMILY};

const SYSTEM_GROUP: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// A metric just crossed its threshold.
    Warning,
    /// Full status, sent whether or not anything breaches.
    Status,
    /// Explicit shutdown alarm.
    Alarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSettings {
    pub width_px: u32,
    pub height_px: u32,
    pub max_points: usize,
}

impl ChartSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            width_px: config.report.width_px,
            height_px: config.report.height_px,
            max_points: usize::from(config.report.max_points),
        }
    }
}

/// Everything besides history and breaches that shapes a report.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub server: String,
    pub kind: ReportKind,
    pub rules: Vec<ThresholdRule>,
    pub notes: Vec<String>,
    pub charts: ChartSettings,
}

/// Metrics plotted on one chart: a `family:` prefix, or the plain system metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChartGroup {
    pub(crate) key: String,
    pub(crate) metrics: Vec<String>,
}

impl ChartGroup {
    pub(crate) fn title(&self) -> String {
        match self.key.as_str() {
            TEMPERATURE_FAMILY => "Temperature Over Time".to_string(),
            DISK_FAMILY => "Disk Usage Over Time".to_string(),
            SYSTEM_GROUP => "CPU and Memory Usage Over Time".to_string(),
            other => format!("{} Over Time", other),
        }
    }

    pub(crate) fn y_desc(&self) -> &'static str {
        match self.key.as_str() {
            TEMPERATURE_FAMILY => "Temperature (°C)",
            DISK_FAMILY | SYSTEM_GROUP => "Usage (%)",
            _ => "Value",
        }
    }

    pub(crate) fn file_name(&self) -> String {
        let slug = self
            .key
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
            .collect::<String>();
        format!("chart-{}.png", slug)
    }

    /// Short label for a series: the part after the family prefix.
    pub(crate) fn series_label<'a>(&self, metric: &'a str) -> &'a str {
        match metric.split_once(':') {
            Some((_, member)) if !member.is_empty() => member,
            _ => metric,
        }
    }
}

pub(crate) fn chart_groups(history: &History) -> Vec<ChartGroup> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for metric in history.metric_names() {
        let key = match metric.split_once(':') {
            Some((family, _)) => family.to_string(),
            None => SYSTEM_GROUP.to_string(),
        };
        groups.entry(key).or_default().push(metric.to_string());
    }

    groups
        .into_iter()
        .map(|(key, metrics)| ChartGroup { key, metrics })
        .collect()
}

/// Whether every plotted value is a percentage, so the axis can be pinned to 0..100.
pub(crate) fn is_percentage_metric(metric: &str) -> bool {
    metric == CPU_METRIC
        || metric == MEMORY_METRIC
        || metric
            .split_once(':')
            .is_some_and(|(family, _)| family == DISK_FAMILY)
}
