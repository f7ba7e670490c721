//! Property-based tests for the status graph.

use proptest::prelude::*;

use crate::invoice::capability::Actor;
use crate::invoice::error::InvoiceError;
use crate::invoice::overdue::OverdueClassifier;
use crate::invoice::service::InvoiceLifecycleService;
use crate::invoice::status::{InvoiceStatus, StatusGraph};
use crate::invoice::test_support::{FIXED_NOW, date, invoice_with_total};

/// Strategy for generating random statuses.
pub fn arb_status() -> impl Strategy<Value = InvoiceStatus> {
    prop::sample::select(InvoiceStatus::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// changeStatus succeeds iff the target is in the table, and a rejection
    /// leaves the invoice unchanged.
    #[test]
    fn prop_change_status_follows_table(from in arb_status(), to in arb_status()) {
        let svc = InvoiceLifecycleService::default();
        let mut invoice = invoice_with_total(from);
        let before = invoice.clone();

        let result = svc.change_status(&mut invoice, to, None, &Actor::system(), *FIXED_NOW);

        if StatusGraph::allowed_targets(from).contains(&to) {
            let outcome = result.unwrap();
            prop_assert_eq!(outcome.status, to);
            prop_assert_eq!(invoice.status(), to);
            prop_assert_eq!(invoice.status_history().len(), before.status_history().len() + 1);
        } else {
            prop_assert_eq!(result, Err(InvoiceError::IllegalTransition { from, to }));
            prop_assert_eq!(invoice, before);
        }
    }

    /// Terminal statuses never leave through a generic status change.
    #[test]
    fn prop_terminal_has_no_exit(to in arb_status()) {
        prop_assert!(!StatusGraph::is_transition_allowed(InvoiceStatus::Cancelled, to));
        prop_assert!(!StatusGraph::is_transition_allowed(InvoiceStatus::Refunded, to));
    }

    /// Only statuses awaiting payment can be overdue.
    #[test]
    fn prop_overdue_only_when_awaiting_payment(
        status in arb_status(),
        due_offset in -400i64..400,
    ) {
        let today = date(2026, 6, 15);
        let due = today + chrono::Duration::days(due_offset);
        let overdue = OverdueClassifier::is_overdue(status, Some(due), today);

        if status.is_awaiting_payment() {
            prop_assert_eq!(overdue, due_offset < 0);
        } else {
            prop_assert!(!overdue);
        }
    }
}
