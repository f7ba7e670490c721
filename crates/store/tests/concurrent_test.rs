//! Concurrent writers on one invoice.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use factura_core::invoice::{
    Actor, ClientRef, InvoiceError, InvoiceLifecycleService, InvoiceStatus, NewInvoice,
    NewInvoiceItem, PaymentInput, PaymentMethod,
};
use factura_shared::types::{ClientId, Currency, InvoiceId};
use factura_store::{InMemoryInvoiceStore, InvoiceCommands};

fn commands() -> InvoiceCommands {
    InvoiceCommands::new(
        Arc::new(InMemoryInvoiceStore::new()),
        InvoiceLifecycleService::default(),
        "INV",
    )
}

fn new_invoice() -> NewInvoice {
    NewInvoice {
        invoice_number: String::new(),
        invoice_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        due_date: NaiveDate::from_ymd_opt(2026, 3, 31),
        currency: Currency::Eur,
        client: ClientRef {
            id: ClientId::new(),
            name: "Acme".to_string(),
            email: None,
        },
        items: vec![NewInvoiceItem {
            product_name: "Widget".to_string(),
            product_sku: None,
            quantity: 2,
            unit_price_ht: dec!(100),
            tax_rate: dec!(20),
        }],
        terms_conditions: None,
        notes: None,
        internal_notes: None,
    }
}

fn pay(amount: Decimal) -> PaymentInput {
    PaymentInput {
        amount,
        paid_at: NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(),
        method: PaymentMethod::BankTransfer,
        label: None,
        reference: None,
    }
}

async fn sent_invoice(cmds: &InvoiceCommands) -> InvoiceId {
    let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
    let actor = Actor::system();
    let created = cmds.create(new_invoice(), &actor, now).await.unwrap();
    let id = created.value.id();
    cmds.send(id, None, &actor, now).await.unwrap();
    id
}

/// Two payments of 200 against a 240 balance: at most one may land.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_never_overshoot() {
    let cmds = commands();
    let id = sent_invoice(&cmds).await;
    let barrier = Arc::new(Barrier::new(2));

    let tasks = (0..2).map(|_| {
        let cmds = cmds.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            cmds.record_payment(id, pay(dec!(200)), &Actor::system(), Utc::now())
                .await
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let committed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(committed, 1);
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(
                    err,
                    InvoiceError::ConcurrentModification { .. }
                        | InvoiceError::OverpaymentRejected { .. }
                ),
                "unexpected error: {err:?}"
            );
        }
    }

    let stored = cmds.get(id).await.unwrap();
    assert_eq!(stored.value.payments().len(), 1);
    assert_eq!(stored.value.paid_amount(), dec!(200));
    assert_eq!(stored.value.remaining_amount(), dec!(40));
    assert_eq!(stored.value.status(), InvoiceStatus::PartiallyPaid);
}

/// Many small writers: every commit is reflected exactly once and the
/// version counts the commits.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_retrying_writers_all_commit_in_order() {
    let cmds = commands();
    let id = sent_invoice(&cmds).await;
    let start_version = cmds.get(id).await.unwrap().version;
    let writers = 8;
    let barrier = Arc::new(Barrier::new(writers));

    let tasks = (0..writers).map(|_| {
        let cmds = cmds.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            loop {
                match cmds
                    .record_payment(id, pay(dec!(10)), &Actor::system(), Utc::now())
                    .await
                {
                    Err(err) if err.is_retryable() => tokio::task::yield_now().await,
                    other => return other,
                }
            }
        })
    });
    for joined in join_all(tasks).await {
        joined.unwrap().unwrap();
    }

    let stored = cmds.get(id).await.unwrap();
    assert_eq!(stored.value.payments().len(), writers);
    assert_eq!(stored.value.paid_amount(), dec!(80));
    assert_eq!(stored.version, start_version + writers as u64);

    let history = stored.value.status_history();
    assert!(history.windows(2).all(|w| w[0].sequence + 1 == w[1].sequence));
}
