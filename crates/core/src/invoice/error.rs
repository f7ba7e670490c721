//! Invoice error types.
//!
//! Every rejection leaves the aggregate unchanged.

use rust_decimal::Decimal;
use thiserror::Error;

use factura_shared::types::{InvoiceId, InvoiceItemId};

use crate::invoice::capability::Capability;
use crate::invoice::status::InvoiceStatus;

/// Errors that can occur during invoice lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    /// Requested status is not reachable from the current status.
    #[error("Invalid status transition from {from} to {to}")]
    IllegalTransition {
        /// The current status.
        from: InvoiceStatus,
        /// The attempted target status.
        to: InvoiceStatus,
    },

    /// Payment amount is not strictly positive or has sub-minor-unit digits.
    #[error("Invalid payment amount {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// Payment exceeds the remaining balance.
    #[error("Payment of {amount} exceeds remaining balance {remaining}")]
    OverpaymentRejected {
        /// The rejected amount.
        amount: Decimal,
        /// Remaining balance at call time.
        remaining: Decimal,
    },

    /// Mutation attempted on a cancelled or refunded invoice.
    #[error("Invoice is {0} and cannot be modified")]
    TerminalState(InvoiceStatus),

    /// Actor lacks the capability for the operation.
    #[error("Actor lacks capability {0}")]
    Unauthorized(Capability),

    /// Invoice not found.
    #[error("Invoice {0} not found")]
    NotFound(InvoiceId),

    /// Another writer committed first.
    #[error("Invoice was modified concurrently (expected version {expected}, found {actual})")]
    ConcurrentModification {
        /// Version the operation was based on.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Items and details can only change while the invoice is a draft.
    #[error("Invoice is {0}; only drafts can be edited")]
    NotEditable(InvoiceStatus),

    /// Line item failed validation.
    #[error("Invalid line item: {0}")]
    InvalidItem(String),

    /// Invoice header failed validation.
    #[error("Invalid invoice: {0}")]
    InvalidInvoice(String),

    /// Line item not found on the invoice.
    #[error("Line item {0} not found")]
    ItemNotFound(InvoiceItemId),

    /// Invoice cannot be deleted.
    #[error("Invoice cannot be deleted: {0}")]
    DeletionRejected(String),

    /// Invoice number already in use.
    #[error("Invoice number {0} already exists")]
    DuplicateInvoiceNumber(String),

    /// Reminder requested for an invoice that is not overdue.
    #[error("Invoice is not overdue")]
    NotOverdue,
}

impl InvoiceError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount { .. } | Self::InvalidItem(_) | Self::InvalidInvoice(_) => 400,

            Self::Unauthorized(_) => 403,

            Self::NotFound(_) | Self::ItemNotFound(_) => 404,

            Self::ConcurrentModification { .. } | Self::DuplicateInvoiceNumber(_) => 409,

            Self::IllegalTransition { .. }
            | Self::OverpaymentRejected { .. }
            | Self::TerminalState(_)
            | Self::NotEditable(_)
            | Self::DeletionRejected(_)
            | Self::NotOverdue => 422,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::OverpaymentRejected { .. } => "OVERPAYMENT_REJECTED",
            Self::TerminalState(_) => "TERMINAL_STATE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "INVOICE_NOT_FOUND",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::NotEditable(_) => "INVOICE_NOT_EDITABLE",
            Self::InvalidItem(_) => "INVALID_ITEM",
            Self::InvalidInvoice(_) => "INVALID_INVOICE",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::DeletionRejected(_) => "DELETION_REJECTED",
            Self::DuplicateInvoiceNumber(_) => "DUPLICATE_INVOICE_NUMBER",
            Self::NotOverdue => "NOT_OVERDUE",
        }
    }

    /// Returns true if the caller may retry the same operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_illegal_transition_error() {
        let err = InvoiceError::IllegalTransition {
            from: InvoiceStatus::Draft,
            to: InvoiceStatus::Paid,
        };
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "ILLEGAL_TRANSITION");
        assert!(err.to_string().contains("draft"));
        assert!(err.to_string().contains("paid"));
    }

    #[test]
    fn test_overpayment_error_mentions_amounts() {
        let err = InvoiceError::OverpaymentRejected {
            amount: dec!(150.00),
            remaining: dec!(140.00),
        };
        assert_eq!(err.error_code(), "OVERPAYMENT_REJECTED");
        assert!(err.to_string().contains("150.00"));
        assert!(err.to_string().contains("140.00"));
    }

    #[test]
    fn test_unauthorized_error() {
        let err = InvoiceError::Unauthorized(Capability::Reopen);
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_string(), "Actor lacks capability invoice:reopen");
    }

    #[test]
    fn test_not_found_error() {
        let err = InvoiceError::NotFound(InvoiceId::new());
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "INVOICE_NOT_FOUND");
    }

    #[test]
    fn test_only_concurrent_modification_is_retryable() {
        assert!(
            InvoiceError::ConcurrentModification {
                expected: 1,
                actual: 2
            }
            .is_retryable()
        );
        assert!(!InvoiceError::TerminalState(InvoiceStatus::Refunded).is_retryable());
        assert!(!InvoiceError::InvalidAmount { amount: dec!(0) }.is_retryable());
    }
}
