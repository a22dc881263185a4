use clap::ValueEnum;

use crate::monitor::{has_new_breach, Breach};
use crate::report::ReportKind;

/// What one invocation is allowed to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Sample, and mail a warning when a breach is new.
    Check,
    /// Sample only; never report.
    Silent,
    /// Sample and always send the full status report.
    Status,
    /// Sample and always send the shutdown alarm.
    Alarm,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Check => "check",
            RunMode::Silent => "silent",
            RunMode::Status => "status",
            RunMode::Alarm => "alarm",
        }
    }

    pub fn notify_enabled(self) -> bool {
        !matches!(self, RunMode::Silent)
    }

    pub fn should_report(self, breaches: &[Breach]) -> bool {
        if !self.notify_enabled() {
            return false;
        }
        match self {
            RunMode::Check => has_new_breach(breaches),
            RunMode::Silent | RunMode::Status | RunMode::Alarm => true,
        }
    }

    pub fn report_kind(self) -> ReportKind {
        match self {
            RunMode::Alarm => ReportKind::Alarm,
            RunMode::Status => ReportKind::Status,
            RunMode::Check | RunMode::Silent => ReportKind::Warning,
        }
    }
}
