//! Invoice domain types.
//!
//! `Invoice` is the aggregate root. It owns its items, payments and status
//! history; the payment and history sequences are append-only and only the
//! lifecycle service mutates them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use factura_shared::types::{ClientId, Currency, InvoiceId, InvoiceItemId, PaymentId, UserId};

use crate::invoice::ledger::PaymentLedger;
use crate::invoice::overdue::OverdueClassifier;
use crate::invoice::status::InvoiceStatus;
use crate::invoice::totals::{InvoiceTotals, LineItemCalculator};

/// Payment method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash.
    Cash,
    /// Bank transfer.
    BankTransfer,
    /// Card.
    Card,
    /// Cheque.
    Check,
    /// Any other method.
    Other,
    /// Not recorded.
    #[default]
    Unspecified,
}

impl PaymentMethod {
    /// Returns the string representation of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Card => "card",
            Self::Check => "check",
            Self::Other => "other",
            Self::Unspecified => "unspecified",
        }
    }

    /// Parses a method from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Some(Self::Cash),
            "bank_transfer" => Some(Self::BankTransfer),
            "card" => Some(Self::Card),
            "check" => Some(Self::Check),
            "other" => Some(Self::Other),
            "unspecified" | "" => Some(Self::Unspecified),
            _ => None,
        }
    }
}

/// Reference to the billed client. Not owned by the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    /// Client identifier.
    pub id: ClientId,
    /// Display name at invoicing time.
    pub name: String,
    /// Contact address for reminders.
    pub email: Option<String>,
}

/// Snapshot of a product line at invoice-creation time.
///
/// Never recalculated from live catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Item identifier.
    pub id: InvoiceItemId,
    /// Product name when invoiced.
    pub product_name_snapshot: String,
    /// Product SKU when invoiced.
    pub product_sku_snapshot: Option<String>,
    /// Quantity, at least 1.
    pub quantity: u32,
    /// Unit price excluding tax.
    pub unit_price_ht_snapshot: Decimal,
    /// Tax rate in percent, 0 to 100.
    pub tax_rate_snapshot: Decimal,
}

/// Input for a new line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoiceItem {
    /// Product name.
    pub product_name: String,
    /// Product SKU.
    pub product_sku: Option<String>,
    /// Quantity.
    pub quantity: u32,
    /// Unit price excluding tax.
    pub unit_price_ht: Decimal,
    /// Tax rate in percent.
    pub tax_rate: Decimal,
}

/// Partial update of a draft line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChanges {
    /// New product name.
    pub product_name: Option<String>,
    /// New SKU.
    pub product_sku: Option<Option<String>>,
    /// New quantity.
    pub quantity: Option<u32>,
    /// New unit price.
    pub unit_price_ht: Option<Decimal>,
    /// New tax rate.
    pub tax_rate: Option<Decimal>,
}

/// Partial update of draft invoice details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsChanges {
    /// New due date (`Some(None)` clears it).
    pub due_date: Option<Option<NaiveDate>>,
    /// New terms and conditions.
    pub terms_conditions: Option<Option<String>>,
    /// New client-facing notes.
    pub notes: Option<Option<String>>,
    /// New internal notes.
    pub internal_notes: Option<Option<String>>,
}

/// A payment recorded against an invoice.
///
/// Never removed. Reopening an invoice voids its payments instead, so they stop
/// counting toward the paid amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier.
    pub id: PaymentId,
    /// Amount received, strictly positive.
    pub amount: Decimal,
    /// Date the payment was received.
    pub paid_at: NaiveDate,
    /// How the payment was made.
    pub method: PaymentMethod,
    /// Free-text label.
    pub label: Option<String>,
    /// External reference (transfer id, cheque number).
    pub reference: Option<String>,
    /// When the payment was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Who recorded it.
    pub recorded_by: Option<UserId>,
    /// When the invoice was reopened and this payment stopped counting.
    #[serde(default)]
    pub voided_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Whether the payment still counts toward the paid amount.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.voided_at.is_none()
    }
}

/// Input for recording a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    /// Amount received.
    pub amount: Decimal,
    /// Date the payment was received.
    pub paid_at: NaiveDate,
    /// Payment method.
    #[serde(default)]
    pub method: PaymentMethod,
    /// Free-text label.
    pub label: Option<String>,
    /// External reference.
    pub reference: Option<String>,
}

/// One entry of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    /// Position in the trail, starting at 1.
    pub sequence: u32,
    /// Previous status, `None` on creation.
    pub from_status: Option<InvoiceStatus>,
    /// New status.
    pub to_status: InvoiceStatus,
    /// Optional comment.
    pub comment: Option<String>,
    /// Acting user, `None` for the system.
    pub actor: Option<UserId>,
    /// When the entry was recorded. Non-decreasing along the trail.
    pub created_at: DateTime<Utc>,
}

/// Input for creating an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    /// Unique invoice number.
    pub invoice_number: String,
    /// Invoice date.
    pub invoice_date: NaiveDate,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Billing currency.
    pub currency: Currency,
    /// Billed client.
    pub client: ClientRef,
    /// Initial line items.
    pub items: Vec<NewInvoiceItem>,
    /// Terms and conditions.
    pub terms_conditions: Option<String>,
    /// Client-facing notes.
    pub notes: Option<String>,
    /// Internal notes.
    pub internal_notes: Option<String>,
}

/// The invoice aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    invoice_number: String,
    status: InvoiceStatus,
    invoice_date: NaiveDate,
    due_date: Option<NaiveDate>,
    currency: Currency,
    client: ClientRef,
    items: Vec<InvoiceItem>,
    terms_conditions: Option<String>,
    notes: Option<String>,
    internal_notes: Option<String>,
    status_history: Vec<StatusHistoryEntry>,
    payments: Vec<Payment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Builds an empty draft. Items and the creation entry are added by the service.
    pub(crate) fn draft(input: &NewInvoice, now: DateTime<Utc>) -> Self {
        Self {
            id: InvoiceId::new(),
            invoice_number: input.invoice_number.trim().to_string(),
            status: InvoiceStatus::Draft,
            invoice_date: input.invoice_date,
            due_date: input.due_date,
            currency: input.currency,
            client: input.client.clone(),
            items: Vec::new(),
            terms_conditions: input.terms_conditions.clone(),
            notes: input.notes.clone(),
            internal_notes: input.internal_notes.clone(),
            status_history: Vec::new(),
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Invoice identifier.
    #[must_use]
    pub const fn id(&self) -> InvoiceId {
        self.id
    }

    /// Invoice number, immutable after creation.
    #[must_use]
    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> InvoiceStatus {
        self.status
    }

    /// Invoice date.
    #[must_use]
    pub const fn invoice_date(&self) -> NaiveDate {
        self.invoice_date
    }

    /// Due date, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Billing currency.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Billed client.
    #[must_use]
    pub const fn client(&self) -> &ClientRef {
        &self.client
    }

    /// Line items in order.
    #[must_use]
    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    /// Terms and conditions.
    #[must_use]
    pub fn terms_conditions(&self) -> Option<&str> {
        self.terms_conditions.as_deref()
    }

    /// Client-facing notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Internal notes.
    #[must_use]
    pub fn internal_notes(&self) -> Option<&str> {
        self.internal_notes.as_deref()
    }

    /// Audit trail in insertion order.
    #[must_use]
    pub fn status_history(&self) -> &[StatusHistoryEntry] {
        &self.status_history
    }

    /// Payments in insertion order.
    #[must_use]
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// HT, tax and TTC totals recomputed from the items.
    #[must_use]
    pub fn totals(&self) -> InvoiceTotals {
        LineItemCalculator::invoice_totals(&self.items, self.currency)
    }

    /// Sum of payments that have not been voided.
    #[must_use]
    pub fn paid_amount(&self) -> Decimal {
        PaymentLedger::paid_amount(self)
    }

    /// `max(total TTC - paid, 0)`.
    #[must_use]
    pub fn remaining_amount(&self) -> Decimal {
        PaymentLedger::remaining_amount(self)
    }

    /// Remaining amount that can still be collected; zero once cancelled or refunded.
    #[must_use]
    pub fn collectible_amount(&self) -> Decimal {
        PaymentLedger::collectible_amount(self)
    }

    /// Whether the invoice is overdue on the given calendar day.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        OverdueClassifier::is_overdue(self.status, self.due_date, today)
    }

    pub(crate) fn set_status(&mut self, status: InvoiceStatus, now: DateTime<Utc>) {
        self.status = status;
        self.touch(now);
    }

    pub(crate) fn push_history(&mut self, entry: StatusHistoryEntry) {
        self.status_history.push(entry);
    }

    pub(crate) fn push_payment(&mut self, payment: Payment) {
        self.updated_at = self.updated_at.max(payment.recorded_at);
        self.payments.push(payment);
    }

    pub(crate) fn void_payments(&mut self, now: DateTime<Utc>) {
        for payment in self.payments.iter_mut().filter(|p| p.is_active()) {
            payment.voided_at = Some(now);
        }
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<InvoiceItem> {
        &mut self.items
    }

    pub(crate) fn apply_details(&mut self, changes: DetailsChanges) {
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        if let Some(terms) = changes.terms_conditions {
            self.terms_conditions = terms;
        }
        if let Some(notes) = changes.notes {
            self.notes = notes;
        }
        if let Some(internal_notes) = changes.internal_notes {
            self.internal_notes = internal_notes;
        }
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = self.updated_at.max(now);
    }
}
