//! Repository abstraction for invoice aggregates.
//!
//! Every stored invoice carries a version. Writers must present the version
//! they loaded; a mismatch means someone else committed first.

use async_trait::async_trait;
use chrono::NaiveDate;

use factura_core::invoice::{Invoice, InvoiceError, InvoiceFilter};
use factura_shared::types::InvoiceId;

/// An aggregate together with its stored version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// Version of the stored copy, starting at 1.
    pub version: u64,
    /// The stored value.
    pub value: T,
}

impl<T> Versioned<T> {
    /// Wraps a freshly inserted value.
    #[must_use]
    pub const fn initial(value: T) -> Self {
        Self { version: 1, value }
    }
}

/// Persistence boundary for invoices.
///
/// `save` and `delete` are atomic per invoice: either the expected version
/// matches and the write lands, or nothing changes.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Stores a new invoice.
    ///
    /// Fails with `DuplicateInvoiceNumber` if the number is taken.
    async fn insert(&self, invoice: Invoice) -> Result<Versioned<Invoice>, InvoiceError>;

    /// Loads an invoice with its current version.
    async fn load(&self, id: InvoiceId) -> Result<Versioned<Invoice>, InvoiceError>;

    /// Replaces an invoice if its stored version equals `expected_version`.
    ///
    /// Returns the new version.
    async fn save(&self, invoice: Invoice, expected_version: u64) -> Result<u64, InvoiceError>;

    /// Removes an invoice if its stored version equals `expected_version`.
    async fn delete(&self, id: InvoiceId, expected_version: u64) -> Result<(), InvoiceError>;

    /// Lists invoices matching every filter, newest invoice date first.
    async fn list(
        &self,
        filters: &[InvoiceFilter],
        today: NaiveDate,
    ) -> Result<Vec<Versioned<Invoice>>, InvoiceError>;

    /// Allocates the next free number `{prefix}-{year}-{seq:05}`.
    async fn next_invoice_number(&self, prefix: &str, year: i32) -> Result<String, InvoiceError>;
}
