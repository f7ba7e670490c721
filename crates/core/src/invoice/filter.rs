//! Typed list filters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use factura_shared::types::ClientId;

use crate::invoice::status::InvoiceStatus;
use crate::invoice::types::Invoice;

/// One criterion of an invoice listing. Criteria are combined with AND.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InvoiceFilter {
    /// Current status equals.
    Status(InvoiceStatus),
    /// Billed to the client.
    Client(ClientId),
    /// Overdue predicate equals.
    Overdue(bool),
    /// Due strictly before the date.
    DueBefore(NaiveDate),
    /// Invoice number contains the text, case-insensitively.
    NumberContains(String),
}

impl InvoiceFilter {
    /// Evaluates the criterion against an invoice on the given day.
    #[must_use]
    pub fn matches(&self, invoice: &Invoice, today: NaiveDate) -> bool {
        match self {
            Self::Status(status) => invoice.status() == *status,
            Self::Client(client_id) => invoice.client().id == *client_id,
            Self::Overdue(expected) => invoice.is_overdue(today) == *expected,
            Self::DueBefore(date) => invoice.due_date().is_some_and(|due| due < *date),
            Self::NumberContains(needle) => invoice
                .invoice_number()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }

    /// Returns true if every filter matches.
    #[must_use]
    pub fn matches_all(filters: &[Self], invoice: &Invoice, today: NaiveDate) -> bool {
        filters.iter().all(|f| f.matches(invoice, today))
    }
}
