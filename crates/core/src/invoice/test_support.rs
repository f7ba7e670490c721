//! Shared fixtures for the invoice unit and property tests.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use factura_shared::types::{ClientId, Currency, UserId};

use crate::invoice::capability::{Actor, Capability};
use crate::invoice::history::HistoryRecorder;
use crate::invoice::service::InvoiceLifecycleService;
use crate::invoice::status::InvoiceStatus;
use crate::invoice::types::{ClientRef, Invoice, NewInvoice, NewInvoiceItem, PaymentInput};

pub static FIXED_NOW: LazyLock<DateTime<Utc>> =
    LazyLock::new(|| Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap());

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn actor_with(capabilities: &[Capability]) -> Actor {
    Actor::user(UserId::new(), capabilities.iter().map(Capability::as_str))
}

/// 2 x 100.00 at 20% tax: 240.00 TTC, due 2026-03-31.
pub fn new_invoice() -> NewInvoice {
    NewInvoice {
        invoice_number: "INV-2026-00001".to_string(),
        invoice_date: date(2026, 3, 1),
        due_date: Some(date(2026, 3, 31)),
        currency: Currency::Eur,
        client: ClientRef {
            id: ClientId::new(),
            name: "Acme SARL".to_string(),
            email: Some("billing@acme.test".to_string()),
        },
        items: vec![NewInvoiceItem {
            product_name: "Consulting day".to_string(),
            product_sku: Some("CONS-1".to_string()),
            quantity: 2,
            unit_price_ht: dec!(100),
            tax_rate: dec!(20),
        }],
        terms_conditions: Some("Net 30".to_string()),
        notes: None,
        internal_notes: None,
    }
}

/// A fresh 240.00 invoice forced into `status`, bypassing the graph.
pub fn invoice_with_total(status: InvoiceStatus) -> Invoice {
    let mut invoice = InvoiceLifecycleService::default()
        .create(new_invoice(), &Actor::system(), *FIXED_NOW)
        .unwrap();
    if status != InvoiceStatus::Draft {
        invoice.set_status(status, *FIXED_NOW);
        HistoryRecorder::append(
            &mut invoice,
            Some(InvoiceStatus::Draft),
            status,
            None,
            None,
            *FIXED_NOW,
        );
    }
    invoice
}

pub fn sent_invoice() -> Invoice {
    let svc = InvoiceLifecycleService::default();
    let mut invoice = svc
        .create(new_invoice(), &Actor::system(), *FIXED_NOW)
        .unwrap();
    svc.send(&mut invoice, None, &Actor::system(), *FIXED_NOW)
        .unwrap();
    invoice
}

pub fn payment(amount: Decimal) -> PaymentInput {
    PaymentInput {
        amount,
        paid_at: date(2026, 3, 12),
        method: crate::invoice::types::PaymentMethod::BankTransfer,
        label: None,
        reference: None,
    }
}
