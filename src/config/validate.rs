use thiserror::Error;

use super::schema::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Validation(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server must not be empty".to_string(),
            ));
        }
        if self.history.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "history.path must not be empty".to_string(),
            ));
        }
        if self.history.lock_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "history.lock_path must not be empty".to_string(),
            ));
        }
        if self.history.lock_path == self.history.path {
            return Err(ConfigError::Validation(
                "history.lock_path must differ from history.path".to_string(),
            ));
        }
        if self.history.stale_lock_secs == 0 {
            return Err(ConfigError::Validation(
                "history.stale_lock_secs must be greater than 0".to_string(),
            ));
        }
        if self.history.max_samples == Some(0) {
            return Err(ConfigError::Validation(
                "history.max_samples must be greater than 0 when set".to_string(),
            ));
        }
        if self.collector.partitions.is_empty() {
            return Err(ConfigError::Validation(
                "collector.partitions must list at least one mount point".to_string(),
            ));
        }
        if self
            .collector
            .partitions
            .iter()
            .any(|partition| partition.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "collector.partitions must not contain empty entries".to_string(),
            ));
        }
        if self.collector.cpu_sample_millis < 200 {
            return Err(ConfigError::Validation(
                "collector.cpu_sample_millis must be at least 200".to_string(),
            ));
        }

        for (index, threshold) in self.thresholds.iter().enumerate() {
            validate_threshold_metric(index, &threshold.metric)?;
            if !threshold.limit.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "thresholds[{}].limit must be a finite number",
                    index
                )));
            }
            if !threshold.margin.is_finite() || threshold.margin.is_sign_negative() {
                return Err(ConfigError::Validation(format!(
                    "thresholds[{}].margin must be a non-negative number",
                    index
                )));
            }
        }

        if self.report.max_points < 10 {
            return Err(ConfigError::Validation(
                "report.max_points must be at least 10".to_string(),
            ));
        }
        if self.report.width_px == 0 || self.report.height_px == 0 {
            return Err(ConfigError::Validation(
                "report.width_px and report.height_px must be greater than 0".to_string(),
            ));
        }
        if let Some(dir) = &self.report.output_dir
            && dir.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "report.output_dir must not be empty when set".to_string(),
            ));
        }

        if self.email.enabled {
            for (field, value) in [
                ("email.sender", &self.email.sender),
                ("email.receiver", &self.email.receiver),
                ("email.app_password", &self.email.app_password),
                ("email.mailserver", &self.email.mailserver),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "{} must not be empty when email.enabled is true",
                        field
                    )));
                }
            }
            if self.email.port == 0 {
                return Err(ConfigError::Validation(
                    "email.port must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn validate_threshold_metric(index: usize, metric: &str) -> Result<(), ConfigError> {
    let metric = metric.trim();
    if metric.is_empty() {
        return Err(ConfigError::Validation(format!(
            "thresholds[{}].metric must not be empty",
            index
        )));
    }

    let wildcard_ok = match metric.find('*') {
        None => true,
        Some(position) => {
            position == metric.len() - 1 && metric[..position].ends_with(':') && position > 1
        }
    };
    if !wildcard_ok {
        return Err(ConfigError::Validation(format!(
            "thresholds[{}].metric must be a metric name or a `family:*` pattern",
            index
        )));
    }

    Ok(())
}
