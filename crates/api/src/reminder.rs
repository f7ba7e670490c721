//! Payment reminder delivery.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use factura_core::invoice::PaymentReminder;
use factura_shared::{AppError, EmailService, ReminderEmail};

/// How a reminder reached the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum ReminderDelivery {
    /// Sent by email.
    Emailed {
        /// Address the reminder went to.
        recipient: String,
    },
    /// Only written to the log.
    Logged,
}

/// Delivers payment reminders built by the lifecycle service.
#[async_trait]
pub trait ReminderDispatcher: Send + Sync {
    /// Delivers one reminder.
    async fn dispatch(&self, reminder: &PaymentReminder) -> Result<ReminderDelivery, AppError>;
}

/// Logs reminders without contacting anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReminderDispatcher;

#[async_trait]
impl ReminderDispatcher for LogReminderDispatcher {
    async fn dispatch(&self, reminder: &PaymentReminder) -> Result<ReminderDelivery, AppError> {
        info!(
            invoice_id = %reminder.invoice_id,
            invoice_number = %reminder.invoice_number,
            client = %reminder.client.name,
            remaining = %reminder.remaining,
            days_overdue = reminder.days_overdue,
            "Payment reminder logged"
        );
        Ok(ReminderDelivery::Logged)
    }
}

/// Emails reminders over SMTP.
///
/// Clients without an email address fall back to a log line.
#[derive(Clone)]
pub struct EmailReminderDispatcher {
    email: EmailService,
}

impl EmailReminderDispatcher {
    /// Wraps an SMTP email service.
    #[must_use]
    pub const fn new(email: EmailService) -> Self {
        Self { email }
    }
}

#[async_trait]
impl ReminderDispatcher for EmailReminderDispatcher {
    async fn dispatch(&self, reminder: &PaymentReminder) -> Result<ReminderDelivery, AppError> {
        let (Some(to_email), Some(due_date)) = (reminder.client.email.as_deref(), reminder.due_date)
        else {
            return LogReminderDispatcher.dispatch(reminder).await;
        };

        self.email
            .send_payment_reminder(&ReminderEmail {
                to_email,
                to_name: &reminder.client.name,
                invoice_number: &reminder.invoice_number,
                remaining: reminder.remaining,
                due_date,
                days_overdue: reminder.days_overdue,
            })
            .await?;

        info!(
            invoice_id = %reminder.invoice_id,
            recipient = %to_email,
            "Payment reminder emailed"
        );
        Ok(ReminderDelivery::Emailed {
            recipient: to_email.to_string(),
        })
    }
}
