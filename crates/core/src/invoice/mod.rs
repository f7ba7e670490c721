//! Invoice lifecycle and payment reconciliation.
//!
//! # Modules
//!
//! - `status` - Status enum and the transition graph
//! - `totals` - HT / tax / TTC computation from item snapshots
//! - `ledger` - Payment recording and balance derivation
//! - `overdue` - Time-dependent overdue predicate
//! - `history` - Append-only audit trail
//! - `service` - Lifecycle operations on the aggregate
//! - `filter` - Typed listing criteria

pub mod capability;
pub mod error;
pub mod filter;
pub mod history;
pub mod ledger;
pub mod overdue;
pub mod service;
pub mod status;
pub mod totals;
pub mod types;

#[cfg(test)]
mod ledger_props;
#[cfg(test)]
mod service_props;
#[cfg(test)]
mod status_props;
#[cfg(test)]
mod test_support;

pub use capability::{Actor, Capability};
pub use error::InvoiceError;
pub use filter::InvoiceFilter;
pub use history::HistoryRecorder;
pub use ledger::{PaymentLedger, RecordedPayment};
pub use overdue::OverdueClassifier;
pub use service::{
    AUTO_PAID_COMMENT, AUTO_PARTIALLY_PAID_COMMENT, InvoiceLifecycleService, LifecycleOutcome,
    LifecyclePolicy, PaymentReminder,
};
pub use status::{InvoiceStatus, StatusGraph};
pub use totals::{InvoiceTotals, LineItemCalculator, LineTotals};
pub use types::{
    ClientRef, DetailsChanges, Invoice, InvoiceItem, ItemChanges, NewInvoice, NewInvoiceItem,
    Payment, PaymentInput, PaymentMethod, StatusHistoryEntry,
};
