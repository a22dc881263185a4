mod directory;
mod email;
mod log_sink;
#[cfg(test)]
mod mock;

use thiserror::Error;

use crate::config::Config;
use crate::report::Report;

pub use directory::DirectoryNotifier;
pub use email::EmailNotifier;
pub use log_sink::LogNotifier;
#[cfg(test)]
pub(crate) use mock::MockNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("report delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Build(String),
}

impl NotifyError {
    pub fn code(&self) -> &'static str {
        match self {
            NotifyError::DeliveryFailed(_) => "notify_delivery_failed",
            NotifyError::Address(_) => "notify_address",
            NotifyError::Build(_) => "notify_build",
        }
    }
}

/// Sink for a finished report. Failures are reported, never retried.
pub trait Notifier {
    async fn deliver(&self, report: &Report) -> Result<(), NotifyError>;
}

pub enum ActiveNotifier {
    Email(EmailNotifier),
    Directory(DirectoryNotifier),
    Log(LogNotifier),
}

impl ActiveNotifier {
    /// Mail when enabled, else the report directory when set, else the log.
    pub fn from_config(config: &Config) -> Self {
        if config.email.enabled {
            Self::Email(EmailNotifier::from_config(&config.email))
        } else if let Some(dir) = &config.report.output_dir {
            Self::Directory(DirectoryNotifier::new(dir))
        } else {
            Self::Log(LogNotifier)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActiveNotifier::Email(_) => "email",
            ActiveNotifier::Directory(_) => "directory",
            ActiveNotifier::Log(_) => "log",
        }
    }
}

impl Notifier for ActiveNotifier {
    async fn deliver(&self, report: &Report) -> Result<(), NotifyError> {
        match self {
            ActiveNotifier::Email(notifier) => notifier.deliver(report).await,
            ActiveNotifier::Directory(notifier) => notifier.deliver(report).await,
            ActiveNotifier::Log(notifier) => notifier.deliver(report).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::parse_config;

    use super::{ActiveNotifier, NotifyError};

    #[test]
    fn picks_email_before_directory_before_log() {
        let email = parse_config(
            "[report]\noutput_dir = \"out\"\n[email]\nenabled = true\nsender = \"a@example.org\"\nreceiver = \"b@example.org\"\napp_password = \"pw\"\nmailserver = \"smtp.example.org\"\n",
            "test.toml",
        )
        .expect("valid config");
        assert_eq!(ActiveNotifier::from_config(&email).kind(), "email");

        let directory =
            parse_config("[report]\noutput_dir = \"out\"\n", "test.toml").expect("valid config");
        assert_eq!(ActiveNotifier::from_config(&directory).kind(), "directory");

        let plain = parse_config("", "test.toml").expect("valid config");
        assert_eq!(ActiveNotifier::from_config(&plain).kind(), "log");
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            NotifyError::DeliveryFailed("timeout".to_string()).code(),
            "notify_delivery_failed"
        );
        assert_eq!(
            NotifyError::Build("empty".to_string()).to_string(),
            "could not build message: empty"
        );
    }
}
