//! Property-based tests for totals and the payment ledger.

use proptest::prelude::*;
use rust_decimal::Decimal;

use factura_shared::types::Currency;

use crate::invoice::capability::Actor;
use crate::invoice::error::InvoiceError;
use crate::invoice::service::InvoiceLifecycleService;
use crate::invoice::status::InvoiceStatus;
use crate::invoice::test_support::{FIXED_NOW, payment, sent_invoice};
use crate::invoice::totals::{LineItemCalculator, MAX_LINE_HT};
use crate::invoice::types::NewInvoiceItem;

/// Amount in cents between 0.01 and 300.00.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=30_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_line(
    quantity: impl Strategy<Value = u32>,
    cents: impl Strategy<Value = i64>,
) -> impl Strategy<Value = NewInvoiceItem> {
    (quantity, cents, 0u32..=10_000).prop_map(|(quantity, cents, rate_bp)| NewInvoiceItem {
        product_name: "Item".to_string(),
        product_sku: None,
        quantity,
        unit_price_ht: Decimal::new(cents, 2),
        tax_rate: Decimal::new(i64::from(rate_bp), 2),
    })
}

/// Everyday lines up to 10 000 units of 100 000.00, plus lines of up to
/// 10^13 per unit that may cross the line cap.
fn arb_item() -> impl Strategy<Value = NewInvoiceItem> {
    prop_oneof![
        3 => arb_line(1u32..=10_000, 0i64..=10_000_000),
        1 => arb_line(1u32..=1_000, 0i64..=1_000_000_000_000_000),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// TTC always equals HT plus tax, and tax is at minor-unit precision.
    #[test]
    fn prop_totals_identity(items in prop::collection::vec(arb_item(), 0..8)) {
        let snapshots: Vec<_> = items
            .into_iter()
            .filter_map(|i| LineItemCalculator::snapshot(i, Currency::Eur).ok())
            .collect();
        let totals = LineItemCalculator::invoice_totals(&snapshots, Currency::Eur);

        prop_assert_eq!(
            LineItemCalculator::checked_invoice_totals(&snapshots, Currency::Eur),
            Ok(totals)
        );
        prop_assert_eq!(totals.total_ttc, totals.subtotal_ht + totals.total_tax);
        prop_assert!(totals.total_tax.normalize().scale() <= 2);
        prop_assert!(totals.total_tax >= Decimal::ZERO);
    }

    /// A line is accepted exactly when its HT stays within the cap.
    #[test]
    fn prop_line_cap_decides_acceptance(item in arb_item()) {
        let line_ht = item.unit_price_ht * Decimal::from(item.quantity);
        let result = LineItemCalculator::snapshot(item, Currency::Eur);

        if line_ht > MAX_LINE_HT {
            let rejected = matches!(result, Err(InvoiceError::InvalidItem(_)));
            prop_assert!(rejected);
        } else {
            let accepted = result.is_ok();
            prop_assert!(accepted);
        }
    }

    /// No sequence of payments drives the remaining balance below zero,
    /// and paid + remaining always equals the total.
    #[test]
    fn prop_payments_never_overshoot(amounts in prop::collection::vec(arb_amount(), 1..12)) {
        let svc = InvoiceLifecycleService::default();
        let actor = Actor::system();
        let mut invoice = sent_invoice();
        let total = invoice.totals().total_ttc;

        for amount in amounts {
            let remaining = invoice.remaining_amount();
            let before = invoice.clone();
            let result = svc.record_payment(&mut invoice, payment(amount), &actor, *FIXED_NOW);

            if amount > remaining {
                prop_assert_eq!(result, Err(InvoiceError::OverpaymentRejected { amount, remaining }));
                prop_assert_eq!(&invoice, &before);
            } else {
                prop_assert!(result.is_ok());
            }

            prop_assert!(invoice.remaining_amount() >= Decimal::ZERO);
            prop_assert_eq!(invoice.paid_amount() + invoice.remaining_amount(), total);
            prop_assert_eq!(
                invoice.status() == InvoiceStatus::Paid,
                invoice.remaining_amount().is_zero()
            );
        }
    }

    /// Paying exactly the remaining balance settles the invoice.
    #[test]
    fn prop_exact_remaining_settles(first in arb_amount()) {
        let svc = InvoiceLifecycleService::default();
        let actor = Actor::system();
        let mut invoice = sent_invoice();
        prop_assume!(first < invoice.remaining_amount());

        svc.record_payment(&mut invoice, payment(first), &actor, *FIXED_NOW).unwrap();
        prop_assert_eq!(invoice.status(), InvoiceStatus::PartiallyPaid);

        let rest = invoice.remaining_amount();
        let outcome = svc.record_payment(&mut invoice, payment(rest), &actor, *FIXED_NOW).unwrap();
        prop_assert_eq!(outcome.status, InvoiceStatus::Paid);
        prop_assert!(invoice.remaining_amount().is_zero());
        let rejected = matches!(
            svc.record_payment(&mut invoice, payment(first), &actor, *FIXED_NOW),
            Err(InvoiceError::OverpaymentRejected { .. })
        );
        prop_assert!(rejected);
    }

    /// A paid, refunded and reopened invoice collects its full total again.
    #[test]
    fn prop_reopened_invoice_collects_again(
        amounts in prop::collection::vec(arb_amount(), 1..6)
    ) {
        let svc = InvoiceLifecycleService::default();
        let actor = Actor::system();
        let mut invoice = sent_invoice();
        let total = invoice.totals().total_ttc;

        svc.record_payment(&mut invoice, payment(total), &actor, *FIXED_NOW).unwrap();
        svc.change_status(&mut invoice, InvoiceStatus::Refunded, None, &actor, *FIXED_NOW).unwrap();
        svc.reopen(&mut invoice, None, &actor, *FIXED_NOW).unwrap();
        prop_assert_eq!(invoice.remaining_amount(), total);
        svc.send(&mut invoice, None, &actor, *FIXED_NOW).unwrap();

        for amount in amounts {
            let remaining = invoice.remaining_amount();
            let result = svc.record_payment(&mut invoice, payment(amount), &actor, *FIXED_NOW);
            prop_assert_eq!(result.is_ok(), amount <= remaining);
            prop_assert_eq!(invoice.paid_amount() + invoice.remaining_amount(), total);
        }
    }
}
