//! Payment ledger.
//!
//! Payments only accumulate. The ledger guarantees that the recorded amounts
//! never exceed the invoice total, so `paid + remaining == total` holds for
//! every invoice that was only ever paid through here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use factura_shared::types::{PaymentId, UserId};

use crate::invoice::error::InvoiceError;
use crate::invoice::status::{InvoiceStatus, StatusGraph};
use crate::invoice::types::{Invoice, Payment, PaymentInput};

/// A payment that has been appended, with the status change it calls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPayment {
    /// The appended payment.
    pub payment: Payment,
    /// Remaining balance after the payment.
    pub remaining_after: Decimal,
    /// Status the invoice must move to, already checked against the graph.
    pub auto_transition: Option<InvoiceStatus>,
}

/// Stateless ledger operations on an invoice's payments.
pub struct PaymentLedger;

impl PaymentLedger {
    /// Sum of the payments still in effect; voided ones are skipped.
    #[must_use]
    pub fn paid_amount(invoice: &Invoice) -> Decimal {
        invoice
            .payments()
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.amount)
            .sum()
    }

    /// `max(total TTC - paid, 0)`.
    #[must_use]
    pub fn remaining_amount(invoice: &Invoice) -> Decimal {
        (invoice.totals().total_ttc - Self::paid_amount(invoice)).max(Decimal::ZERO)
    }

    /// Remaining balance that may still be collected.
    ///
    /// Cancelled and refunded invoices have nothing left to collect.
    #[must_use]
    pub fn collectible_amount(invoice: &Invoice) -> Decimal {
        if invoice.status().is_terminal() {
            Decimal::ZERO
        } else {
            Self::remaining_amount(invoice)
        }
    }

    /// Status an invoice moves to once a payment leaves `remaining_after` open.
    #[must_use]
    pub fn auto_transition(
        status: InvoiceStatus,
        remaining_after: Decimal,
    ) -> Option<InvoiceStatus> {
        if remaining_after.is_zero() {
            (status != InvoiceStatus::Paid).then_some(InvoiceStatus::Paid)
        } else if matches!(status, InvoiceStatus::Sent | InvoiceStatus::Issued) {
            Some(InvoiceStatus::PartiallyPaid)
        } else {
            None
        }
    }

    /// Validates a payment and appends it.
    ///
    /// Checks, in order: terminal status, amount sign and precision, remaining
    /// balance, and legality of the induced status change. Nothing is appended
    /// unless all of them pass.
    pub fn record_payment(
        invoice: &mut Invoice,
        input: PaymentInput,
        recorded_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<RecordedPayment, InvoiceError> {
        let status = invoice.status();
        if status.is_terminal() {
            return Err(InvoiceError::TerminalState(status));
        }

        let amount = input.amount;
        if amount <= Decimal::ZERO || !invoice.currency().is_representable(amount) {
            return Err(InvoiceError::InvalidAmount { amount });
        }

        let remaining = Self::remaining_amount(invoice);
        if amount > remaining {
            return Err(InvoiceError::OverpaymentRejected { amount, remaining });
        }

        let remaining_after = remaining - amount;
        let auto_transition = Self::auto_transition(status, remaining_after);
        if let Some(target) = auto_transition {
            if !StatusGraph::is_transition_allowed(status, target) {
                return Err(InvoiceError::IllegalTransition {
                    from: status,
                    to: target,
                });
            }
        }

        let payment = Payment {
            id: PaymentId::new(),
            amount,
            paid_at: input.paid_at,
            method: input.method,
            label: non_blank(input.label),
            reference: non_blank(input.reference),
            recorded_at: now,
            recorded_by,
            voided_at: None,
        };
        invoice.push_payment(payment.clone());

        Ok(RecordedPayment {
            payment,
            remaining_after,
            auto_transition,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
