use std::sync::Mutex;

use crate::report::Report;

use super::{Notifier, NotifyError};

pub(crate) struct MockNotifier {
    fail: bool,
    pub(crate) delivered: Mutex<Vec<Report>>,
}

impl MockNotifier {
    pub(crate) fn new() -> Self {
        Self {
            fail: false,
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn deliveries(&self) -> Vec<Report> {
        self.delivered.lock().map(|reports| reports.clone()).unwrap_or_default()
    }
}

impl Notifier for MockNotifier {
    async fn deliver(&self, report: &Report) -> Result<(), NotifyError> {
        if let Ok(mut reports) = self.delivered.lock() {
            reports.push(report.clone());
        }
        if self.fail {
            return Err(NotifyError::DeliveryFailed("smtp connection refused".to_string()));
        }
        Ok(())
    }
}
