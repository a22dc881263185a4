use std::fs;
use std::path::PathBuf;

use crate::report::Report;

use super::{Notifier, NotifyError};

pub const TEXT_FILE: &str = "report.txt";
pub const HTML_FILE: &str = "report.html";

/// Drops the latest report into a directory, replacing the previous one.
#[derive(Debug, Clone)]
pub struct DirectoryNotifier {
    dir: PathBuf,
}

impl DirectoryNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write(&self, name: &str, contents: &[u8]) -> Result<(), NotifyError> {
        let path = self.dir.join(name);
        fs::write(&path, contents).map_err(|error| {
            NotifyError::DeliveryFailed(format!("{}: {}", path.display(), error))
        })
    }
}

impl Notifier for DirectoryNotifier {
    async fn deliver(&self, report: &Report) -> Result<(), NotifyError> {
        fs::create_dir_all(&self.dir).map_err(|error| {
            NotifyError::DeliveryFailed(format!("{}: {}", self.dir.display(), error))
        })?;

        for image in &report.images {
            self.write(&image.file_name, &image.png)?;
        }
        // file names instead of cid references so the page opens from disk
        let mut html = report.html();
        for image in &report.images {
            html = html.replace(&format!("cid:{}", image.cid), &image.file_name);
        }
        self.write(HTML_FILE, html.as_bytes())?;

        let text = format!("{}\n\n{}", report.subject, report.text());
        self.write(TEXT_FILE, text.as_bytes())?;

        log::info!(
            "report_written dir={} images={}",
            self.dir.display(),
            report.images.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::report::{Report, ReportImage, ReportKind};

    use super::{DirectoryNotifier, Notifier, HTML_FILE, TEXT_FILE};

    #[tokio::test]
    async fn writes_text_html_and_charts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("reports");
        let notifier = DirectoryNotifier::new(&target);

        let report = Report {
            kind: ReportKind::Status,
            subject: "Status report on atlas".to_string(),
            headline: "All is fine!".to_string(),
            lines: vec!["cpu: 3.0".to_string()],
            images: vec![ReportImage {
                cid: "chart-system.png".to_string(),
                file_name: "chart-system.png".to_string(),
                title: "CPU and Memory Usage Over Time".to_string(),
                png: vec![1, 2, 3],
            }],
            notes: Vec::new(),
        };
        notifier.deliver(&report).await.expect("delivered");

        let text = std::fs::read_to_string(target.join(TEXT_FILE)).expect("text");
        assert!(text.starts_with("Status report on atlas\n\nAll is fine!"));
        let html = std::fs::read_to_string(target.join(HTML_FILE)).expect("html");
        assert!(html.contains("src=\"chart-system.png\""));
        assert!(!html.contains("cid:"));
        assert_eq!(
            std::fs::read(target.join("chart-system.png")).expect("png"),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn unwritable_target_is_a_delivery_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").expect("write blocker");

        let notifier = DirectoryNotifier::new(blocker.join("reports"));
        let report = Report {
            kind: ReportKind::Alarm,
            subject: "### ALARM ### on atlas".to_string(),
            headline: "Server atlas is going down NOW!".to_string(),
            lines: Vec::new(),
            images: Vec::new(),
            notes: Vec::new(),
        };
        let error = notifier.deliver(&report).await.expect_err("blocked");
        assert_eq!(error.code(), "notify_delivery_failed");
    }
}
