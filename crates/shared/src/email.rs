//! Email service for payment reminders.
//!
//! Uses `lettre` for SMTP transport.

use chrono::NaiveDate;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::EmailConfig;
use crate::types::Money;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Content of a payment reminder email.
#[derive(Debug, Clone)]
pub struct ReminderEmail<'a> {
    /// Recipient address.
    pub to_email: &'a str,
    /// Recipient display name.
    pub to_name: &'a str,
    /// Invoice number being reminded.
    pub invoice_number: &'a str,
    /// Outstanding amount.
    pub remaining: Money,
    /// Original due date.
    pub due_date: NaiveDate,
    /// Whole days past the due date.
    pub days_overdue: i64,
}

impl ReminderEmail<'_> {
    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("Payment reminder - invoice {}", self.invoice_number)
    }

    /// Plain-text body.
    #[must_use]
    pub fn body(&self, from_name: &str) -> String {
        format!(
            r"Hello {to_name},

Our records show that invoice {number} was due on {due} and is now {days} day(s) overdue.

Outstanding balance: {remaining}

If you have already settled this invoice, please disregard this message.

Best regards,
{from_name}",
            to_name = self.to_name,
            number = self.invoice_number,
            due = self.due_date.format("%Y-%m-%d"),
            days = self.days_overdue,
            remaining = self.remaining,
        )
    }
}

/// Email service for sending reminder emails.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        Ok(AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| EmailError::SendError(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build())
    }

    fn build_message(&self, to_email: &str, subject: &str, body: &str) -> Result<Message, EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))
    }

    /// Sends a payment reminder.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be built or sent.
    pub async fn send_payment_reminder(&self, reminder: &ReminderEmail<'_>) -> Result<(), EmailError> {
        let message = self.build_message(
            reminder.to_email,
            &reminder.subject(),
            &reminder.body(&self.config.from_name),
        )?;

        self.create_transport()?
            .send(message)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
    use rust_decimal_macros::dec;

    fn test_config() -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: "user".to_string(),
            smtp_password: "password".to_string(),
            from_email: "billing@example.com".to_string(),
            from_name: "Billing".to_string(),
        }
    }

    fn reminder() -> ReminderEmail<'static> {
        ReminderEmail {
            to_email: "client@example.com",
            to_name: "Acme",
            invoice_number: "INV-2026-00001",
            remaining: Money::new(dec!(140), Currency::Eur),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            days_overdue: 12,
        }
    }

    #[test]
    fn test_reminder_content() {
        let reminder = reminder();
        assert_eq!(reminder.subject(), "Payment reminder - invoice INV-2026-00001");
        let body = reminder.body("Billing");
        assert!(body.contains("Hello Acme"));
        assert!(body.contains("2026-03-01"));
        assert!(body.contains("12 day(s) overdue"));
        assert!(body.contains("140.00 €"));
    }

    #[tokio::test]
    async fn test_create_transport() {
        let service = EmailService::new(test_config());
        assert!(service.create_transport().is_ok());
    }

    #[test]
    fn test_build_message_rejects_invalid_recipient() {
        let service = EmailService::new(test_config());
        let result = service.build_message("not-an-address", "subject", "body");
        assert!(matches!(result, Err(EmailError::InvalidAddress(_))));
    }

    #[test]
    fn test_email_error_display() {
        let err = EmailError::SendError("connection refused".to_string());
        assert_eq!(err.to_string(), "Failed to send email: connection refused");
    }
}
