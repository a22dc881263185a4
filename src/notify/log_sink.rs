use crate::report::Report;

use super::{Notifier, NotifyError};

/// Writes the report text to the log when no other sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn deliver(&self, report: &Report) -> Result<(), NotifyError> {
        tracing::info!(
            target: "notify",
            subject = %report.subject,
            images = report.images.len(),
            body = %report.text(),
            "report_logged"
        );
        Ok(())
    }
}
