//! Property-based tests for InvoiceLifecycleService.
//!
//! Random operation sequences must keep the aggregate invariants, and every
//! rejected operation must leave the invoice untouched.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use factura_shared::types::UserId;

use crate::invoice::capability::{Actor, Capability};
use crate::invoice::service::InvoiceLifecycleService;
use crate::invoice::status::InvoiceStatus;
use crate::invoice::status_props::arb_status;
use crate::invoice::test_support::{FIXED_NOW, payment, sent_invoice};

#[derive(Debug, Clone)]
enum Op {
    ChangeStatus(InvoiceStatus),
    Send,
    MarkPaid,
    Reopen,
    Pay(Decimal),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_status().prop_map(Op::ChangeStatus),
        Just(Op::Send),
        Just(Op::MarkPaid),
        Just(Op::Reopen),
        (-1_000i64..30_000).prop_map(|c| Op::Pay(Decimal::new(c, 2))),
    ]
}

fn arb_actor() -> impl Strategy<Value = Actor> {
    let caps = [
        Capability::ChangeStatus,
        Capability::Send,
        Capability::MarkPaid,
        Capability::Reopen,
        Capability::RecordPayment,
    ];
    (any::<u128>(), prop::sample::subsequence(caps.to_vec(), 0..=caps.len())).prop_map(
        |(id, caps)| {
            Actor::user(
                UserId::from_uuid(Uuid::from_u128(id)),
                caps.iter().map(Capability::as_str),
            )
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_operation_sequences_keep_invariants(
        ops in prop::collection::vec((arb_op(), arb_actor()), 1..20)
    ) {
        let svc = InvoiceLifecycleService::default();
        let mut invoice = sent_invoice();

        for (op, actor) in ops {
            let before = invoice.clone();
            let result = match op {
                Op::ChangeStatus(to) => svc.change_status(&mut invoice, to, None, &actor, *FIXED_NOW),
                Op::Send => svc.send(&mut invoice, None, &actor, *FIXED_NOW),
                Op::MarkPaid => svc.mark_paid(&mut invoice, None, &actor, *FIXED_NOW),
                Op::Reopen => svc.reopen(&mut invoice, None, &actor, *FIXED_NOW),
                Op::Pay(amount) => svc.record_payment(&mut invoice, payment(amount), &actor, *FIXED_NOW),
            };

            match result {
                Ok(outcome) => {
                    prop_assert_eq!(outcome.status, invoice.status());
                    prop_assert_eq!(outcome.previous_status, before.status());
                    prop_assert_eq!(
                        invoice.status_history().len(),
                        before.status_history().len() + outcome.history.len()
                    );
                    let unreconciled = invoice.status() == InvoiceStatus::Paid
                        && invoice.remaining_amount() > Decimal::ZERO;
                    prop_assert_eq!(outcome.unreconciled_balance.is_some(), unreconciled);
                }
                Err(_) => prop_assert_eq!(&invoice, &before),
            }

            let totals = invoice.totals();
            prop_assert_eq!(totals.total_ttc, totals.subtotal_ht + totals.total_tax);
            prop_assert!(invoice.remaining_amount() >= Decimal::ZERO);
            prop_assert_eq!(
                invoice.remaining_amount(),
                (totals.total_ttc - invoice.paid_amount()).max(Decimal::ZERO)
            );
            prop_assert!(invoice.paid_amount() <= totals.total_ttc);

            let history = invoice.status_history();
            let ordered = history.windows(2).all(|w| {
                w[0].sequence + 1 == w[1].sequence && w[0].created_at <= w[1].created_at
            });
            prop_assert!(ordered);
            prop_assert_eq!(history.last().map(|e| e.to_status), Some(invoice.status()));
        }
    }
}
