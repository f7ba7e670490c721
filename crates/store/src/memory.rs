//! In-memory invoice store.
//!
//! Backed by `DashMap`. A version check and the write that follows it run
//! under the same shard lock, so two writers holding the same version can
//! never both commit.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use factura_core::invoice::{Invoice, InvoiceError, InvoiceFilter};
use factura_shared::types::InvoiceId;

use crate::repository::{InvoiceRepository, Versioned};

/// Invoice store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    invoices: DashMap<InvoiceId, Versioned<Invoice>>,
    numbers: DashMap<String, InvoiceId>,
    sequences: DashMap<(String, i32), u32>,
}

impl InMemoryInvoiceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored invoices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    /// Returns true if no invoice is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceStore {
    async fn insert(&self, invoice: Invoice) -> Result<Versioned<Invoice>, InvoiceError> {
        let id = invoice.id();
        match self.numbers.entry(invoice.invoice_number().to_string()) {
            Entry::Occupied(entry) => {
                return Err(InvoiceError::DuplicateInvoiceNumber(entry.key().clone()));
            }
            Entry::Vacant(entry) => {
                entry.insert(id);
            }
        }

        let stored = Versioned::initial(invoice);
        self.invoices.insert(id, stored.clone());
        Ok(stored)
    }

    async fn load(&self, id: InvoiceId) -> Result<Versioned<Invoice>, InvoiceError> {
        self.invoices
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(InvoiceError::NotFound(id))
    }

    async fn save(&self, invoice: Invoice, expected_version: u64) -> Result<u64, InvoiceError> {
        let id = invoice.id();
        let mut entry = self
            .invoices
            .get_mut(&id)
            .ok_or(InvoiceError::NotFound(id))?;

        if entry.version != expected_version {
            return Err(InvoiceError::ConcurrentModification {
                expected: expected_version,
                actual: entry.version,
            });
        }

        entry.version += 1;
        entry.value = invoice;
        Ok(entry.version)
    }

    async fn delete(&self, id: InvoiceId, expected_version: u64) -> Result<(), InvoiceError> {
        match self
            .invoices
            .remove_if(&id, |_, stored| stored.version == expected_version)
        {
            Some((_, removed)) => {
                self.numbers.remove(removed.value.invoice_number());
                Ok(())
            }
            None => match self.invoices.get(&id) {
                Some(current) => Err(InvoiceError::ConcurrentModification {
                    expected: expected_version,
                    actual: current.version,
                }),
                None => Err(InvoiceError::NotFound(id)),
            },
        }
    }

    async fn list(
        &self,
        filters: &[InvoiceFilter],
        today: NaiveDate,
    ) -> Result<Vec<Versioned<Invoice>>, InvoiceError> {
        let mut invoices: Vec<_> = self
            .invoices
            .iter()
            .filter(|entry| InvoiceFilter::matches_all(filters, &entry.value, today))
            .map(|entry| entry.value().clone())
            .collect();

        invoices.sort_by(|a, b| {
            b.value
                .invoice_date()
                .cmp(&a.value.invoice_date())
                .then_with(|| b.value.invoice_number().cmp(a.value.invoice_number()))
        });
        Ok(invoices)
    }

    async fn next_invoice_number(&self, prefix: &str, year: i32) -> Result<String, InvoiceError> {
        let mut sequence = self.sequences.entry((prefix.to_string(), year)).or_insert(0);
        loop {
            *sequence += 1;
            let number = format!("{prefix}-{year}-{:05}", *sequence);
            if !self.numbers.contains_key(&number) {
                return Ok(number);
            }
        }
    }
}
