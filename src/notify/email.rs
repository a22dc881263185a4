use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::report::Report;

use super::{Notifier, NotifyError};

/// Sends the report over SMTP with STARTTLS, charts inlined as `cid:` parts.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    sender: String,
    receiver: String,
    app_password: String,
    mailserver: String,
    port: u16,
}

impl EmailNotifier {
    pub fn from_config(email: &EmailConfig) -> Self {
        Self {
            sender: email.sender.clone(),
            receiver: email.receiver.clone(),
            app_password: email.app_password.clone(),
            mailserver: email.mailserver.clone(),
            port: email.port,
        }
    }

    pub(crate) fn build_message(&self, report: &Report) -> Result<Message, NotifyError> {
        let from: Mailbox = self.sender.parse()?;
        let to: Mailbox = self.receiver.parse()?;
        let png = ContentType::parse("image/png")
            .map_err(|error| NotifyError::Build(error.to_string()))?;

        let mut related = MultiPart::related().singlepart(SinglePart::html(report.html()));
        for image in &report.images {
            related = related.singlepart(
                Attachment::new_inline(image.cid.clone()).body(image.png.clone(), png.clone()),
            );
        }
        let body = MultiPart::alternative()
            .singlepart(SinglePart::plain(report.text()))
            .multipart(related);

        Message::builder()
            .from(from)
            .to(to)
            .subject(report.subject.clone())
            .multipart(body)
            .map_err(|error| NotifyError::Build(error.to_string()))
    }
}

impl Notifier for EmailNotifier {
    async fn deliver(&self, report: &Report) -> Result<(), NotifyError> {
        let message = self.build_message(report)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.mailserver)
            .map_err(|error| NotifyError::DeliveryFailed(error.to_string()))?
            .port(self.port)
            .credentials(Credentials::new(
                self.sender.clone(),
                self.app_password.clone(),
            ))
            .build();

        mailer
            .send(message)
            .await
            .map_err(|error| NotifyError::DeliveryFailed(error.to_string()))?;

        tracing::info!(
            target: "notify",
            receiver = %self.receiver,
            subject = %report.subject,
            images = report.images.len(),
            "report_mailed"
        );
        Ok(())
    }
}
