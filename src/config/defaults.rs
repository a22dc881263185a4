use crate::monitor::Comparator;

use super::schema::{CollectorConfig, EmailConfig, HistoryConfig, ReportConfig};

pub(super) fn default_server() -> String {
    "localhost".to_string()
}

pub(super) fn default_history_path() -> String {
    "data/status_log.jsonl".to_string()
}

pub(super) fn default_lock_path() -> String {
    "data/kars-check.lock".to_string()
}

pub(super) fn default_stale_lock_secs() -> u64 {
    3600
}

pub(super) fn default_partitions() -> Vec<String> {
    vec!["/".to_string()]
}

pub(super) fn default_cpu_sample_millis() -> u64 {
    1000
}

pub(super) fn default_comparator() -> Comparator {
    Comparator::GreaterOrEqual
}

pub(super) fn default_report_max_points() -> u16 {
    1200
}

pub(super) fn default_report_width_px() -> u32 {
    1200
}

pub(super) fn default_report_height_px() -> u32 {
    480
}

pub(super) fn default_smtp_port() -> u16 {
    587
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            lock_path: default_lock_path(),
            stale_lock_secs: default_stale_lock_secs(),
            max_samples: None,
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            cpu_sample_millis: default_cpu_sample_millis(),
            simulation: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_points: default_report_max_points(),
            width_px: default_report_width_px(),
            height_px: default_report_height_px(),
            output_dir: None,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sender: String::new(),
            receiver: String::new(),
            app_password: String::new(),
            mailserver: String::new(),
            port: default_smtp_port(),
        }
    }
}
