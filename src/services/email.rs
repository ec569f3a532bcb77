//! Run report mail

use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct ReportMailer {
    config: EmailConfig,
}

impl ReportMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send the summary of a finished job
    pub async fn send_report(&self, subject: &str, body: &str) -> AppResult<()> {
        let email = self.build_message(subject, body)?;
        let mailer = self.transport()?;

        // SmtpTransport blocks
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Email(format!("Mail task failed: {}", e)))?
            .map_err(|e| AppError::Email(format!("Failed to send email: {}", e)))?;

        tracing::info!("Report sent to {}", self.config.recipient);
        Ok(())
    }

    fn build_message(&self, subject: &str, body: &str) -> AppResult<Message> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Almar");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Email(format!("Invalid from address: {}", e)))?;
        let to_mailbox = Mailbox::from_str(&self.config.recipient)
            .map_err(|e| AppError::Email(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Email(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Email(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };
        Ok(builder.build())
    }
}

/// Mail subject for a finished job, e.g.
/// `[almar] rename 650 "Monstre" -> "Mønstre": 12 record(s) changed`
pub fn report_subject(action: &str, description: &str, records_changed: usize) -> String {
    format!(
        "[almar] {} {}: {} record(s) changed",
        action, description, records_changed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "almar@example.org".to_string(),
            smtp_from_name: None,
            smtp_use_tls: false,
            recipient: "Cataloguer <cat@example.org>".to_string(),
        }
    }

    #[test]
    fn test_build_message() {
        let mailer = ReportMailer::new(config());
        let message = mailer.build_message("[almar] report", "1 record(s) changed").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: [almar] report"));
        assert!(raw.contains("cat@example.org"));
    }

    #[test]
    fn test_invalid_recipient() {
        let mut config = config();
        config.recipient = "not an address".to_string();
        let err = ReportMailer::new(config).build_message("s", "b").unwrap_err();
        assert!(matches!(err, AppError::Email(_)));
    }

    #[test]
    fn test_report_subject() {
        assert_eq!(
            report_subject("rename", "650 \"Monstre\" -> \"Mønstre\"", 3),
            "[almar] rename 650 \"Monstre\" -> \"Mønstre\": 3 record(s) changed"
        );
    }
}
