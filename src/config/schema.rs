use serde::Deserialize;

use crate::monitor::{Comparator, ThresholdRule};

use super::defaults::*;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub thresholds: Vec<ThresholdConfig>,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
    #[serde(default = "default_lock_path")]
    pub lock_path: String,
    #[serde(default = "default_stale_lock_secs")]
    pub stale_lock_secs: u64,
    #[serde(default)]
    pub max_samples: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_partitions")]
    pub partitions: Vec<String>,
    #[serde(default = "default_cpu_sample_millis")]
    pub cpu_sample_millis: u64,
    #[serde(default)]
    pub simulation: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    pub metric: String,
    #[serde(default = "default_comparator")]
    pub comparator: Comparator,
    pub limit: f64,
    #[serde(default)]
    pub margin: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_max_points")]
    pub max_points: u16,
    #[serde(default = "default_report_width_px")]
    pub width_px: u32,
    #[serde(default = "default_report_height_px")]
    pub height_px: u32,
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub app_password: String,
    #[serde(default)]
    pub mailserver: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
}

impl Config {
    /// Threshold rules in configuration order; the index is the rule id used by breaches.
    pub fn threshold_rules(&self) -> Vec<ThresholdRule> {
        self.thresholds
            .iter()
            .map(|threshold| ThresholdRule {
                margin: threshold.margin,
                ..ThresholdRule::new(&threshold.metric, threshold.comparator, threshold.limit)
            })
            .collect()
    }
}
