//! Invoice command handlers.
//!
//! Each command is one unit of work: load a snapshot, apply one lifecycle
//! operation to a private copy, save it with the loaded version. If the
//! operation fails nothing is written. If another writer committed in the
//! meantime the save fails with `ConcurrentModification` and the caller may
//! retry the whole command.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info, warn};

use factura_core::invoice::{
    Actor, Capability, DetailsChanges, Invoice, InvoiceError, InvoiceFilter, InvoiceItem,
    InvoiceLifecycleService, InvoiceStatus, ItemChanges, LifecycleOutcome, NewInvoice,
    NewInvoiceItem, PaymentInput, PaymentReminder,
};
use factura_shared::types::{InvoiceId, InvoiceItemId};

use crate::repository::{InvoiceRepository, Versioned};

/// Result of a committed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    /// The invoice as stored after the command.
    pub invoice: Invoice,
    /// Its new version.
    pub version: u64,
    /// What the lifecycle operation returned.
    pub result: T,
}

/// Runs lifecycle operations against a repository.
#[derive(Clone)]
pub struct InvoiceCommands {
    repository: Arc<dyn InvoiceRepository>,
    service: InvoiceLifecycleService,
    number_prefix: String,
}

impl InvoiceCommands {
    /// Creates the command handlers.
    #[must_use]
    pub fn new(
        repository: Arc<dyn InvoiceRepository>,
        service: InvoiceLifecycleService,
        number_prefix: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            service,
            number_prefix: number_prefix.into(),
        }
    }

    /// The lifecycle service used by the commands.
    #[must_use]
    pub const fn service(&self) -> &InvoiceLifecycleService {
        &self.service
    }

    /// Loads an invoice with its version.
    pub async fn get(&self, id: InvoiceId) -> Result<Versioned<Invoice>, InvoiceError> {
        self.repository.load(id).await
    }

    /// Lists invoices matching the filters as of `now`.
    pub async fn list(
        &self,
        filters: &[InvoiceFilter],
        now: DateTime<Utc>,
    ) -> Result<Vec<Versioned<Invoice>>, InvoiceError> {
        self.repository.list(filters, self.service.today(now)).await
    }

    /// Creates a draft, allocating a number when the input has none.
    pub async fn create(
        &self,
        mut input: NewInvoice,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Versioned<Invoice>, InvoiceError> {
        // Fail on capability before consuming a sequence number.
        actor.require(Capability::Create)?;

        if input.invoice_number.trim().is_empty() {
            input.invoice_number = self
                .repository
                .next_invoice_number(&self.number_prefix, input.invoice_date.year())
                .await?;
        }

        let invoice = self.service.create(input, actor, now)?;
        let stored = self.repository.insert(invoice).await?;
        info!(
            invoice_id = %stored.value.id(),
            invoice_number = %stored.value.invoice_number(),
            "Invoice created"
        );
        Ok(stored)
    }

    /// Deletes a draft without payments.
    pub async fn delete(&self, id: InvoiceId, actor: &Actor) -> Result<(), InvoiceError> {
        let current = self.repository.load(id).await?;
        self.service.ensure_deletable(&current.value, actor)?;
        self.repository.delete(id, current.version).await?;
        info!(invoice_id = %id, "Invoice deleted");
        Ok(())
    }

    /// Applies `operation` to invoice `id` as one unit of work.
    pub async fn execute<T, F>(
        &self,
        id: InvoiceId,
        operation: F,
    ) -> Result<Committed<T>, InvoiceError>
    where
        F: FnOnce(&InvoiceLifecycleService, &mut Invoice) -> Result<T, InvoiceError> + Send,
        T: Send,
    {
        let Versioned { version, value } = self.repository.load(id).await?;
        let mut invoice = value;

        let result = operation(&self.service, &mut invoice)?;

        match self.repository.save(invoice.clone(), version).await {
            Ok(new_version) => {
                debug!(invoice_id = %id, version = new_version, "Invoice saved");
                Ok(Committed {
                    invoice,
                    version: new_version,
                    result,
                })
            }
            Err(err @ InvoiceError::ConcurrentModification { .. }) => {
                warn!(invoice_id = %id, error = %err, "Lost write race");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Generic status change.
    pub async fn change_status(
        &self,
        id: InvoiceId,
        target: InvoiceStatus,
        comment: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Committed<LifecycleOutcome>, InvoiceError> {
        let committed = self
            .execute(id, |svc, invoice| {
                svc.change_status(invoice, target, comment, actor, now)
            })
            .await?;
        log_transition(id, &committed.result);
        Ok(committed)
    }

    /// Sends a draft or re-sends a cancelled invoice.
    pub async fn send(
        &self,
        id: InvoiceId,
        comment: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Committed<LifecycleOutcome>, InvoiceError> {
        let committed = self
            .execute(id, |svc, invoice| svc.send(invoice, comment, actor, now))
            .await?;
        log_transition(id, &committed.result);
        Ok(committed)
    }

    /// Forces an invoice to paid.
    pub async fn mark_paid(
        &self,
        id: InvoiceId,
        comment: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Committed<LifecycleOutcome>, InvoiceError> {
        let committed = self
            .execute(id, |svc, invoice| svc.mark_paid(invoice, comment, actor, now))
            .await?;
        log_transition(id, &committed.result);
        if let Some(balance) = committed.result.unreconciled_balance {
            warn!(
                invoice_id = %id,
                unreconciled_balance = %balance,
                "Invoice marked paid with an open ledger balance"
            );
        }
        Ok(committed)
    }

    /// Reopens a refunded invoice.
    pub async fn reopen(
        &self,
        id: InvoiceId,
        comment: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Committed<LifecycleOutcome>, InvoiceError> {
        let committed = self
            .execute(id, |svc, invoice| svc.reopen(invoice, comment, actor, now))
            .await?;
        log_transition(id, &committed.result);
        Ok(committed)
    }

    /// Records a payment.
    pub async fn record_payment(
        &self,
        id: InvoiceId,
        input: PaymentInput,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Committed<LifecycleOutcome>, InvoiceError> {
        let committed = self
            .execute(id, |svc, invoice| {
                svc.record_payment(invoice, input, actor, now)
            })
            .await?;
        if let Some(payment) = &committed.result.payment {
            info!(
                invoice_id = %id,
                payment_id = %payment.id,
                amount = %payment.amount,
                remaining = %committed.invoice.remaining_amount(),
                "Payment recorded"
            );
        }
        log_transition(id, &committed.result);
        Ok(committed)
    }

    /// Adds a line item to a draft.
    pub async fn add_item(
        &self,
        id: InvoiceId,
        item: NewInvoiceItem,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Committed<InvoiceItem>, InvoiceError> {
        self.execute(id, |svc, invoice| svc.add_item(invoice, item, actor, now))
            .await
    }

    /// Updates a line item of a draft.
    pub async fn update_item(
        &self,
        id: InvoiceId,
        item_id: InvoiceItemId,
        changes: ItemChanges,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Committed<InvoiceItem>, InvoiceError> {
        self.execute(id, |svc, invoice| {
            svc.update_item(invoice, item_id, changes, actor, now)
        })
        .await
    }

    /// Removes a line item from a draft.
    pub async fn remove_item(
        &self,
        id: InvoiceId,
        item_id: InvoiceItemId,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Committed<InvoiceItem>, InvoiceError> {
        self.execute(id, |svc, invoice| {
            svc.remove_item(invoice, item_id, actor, now)
        })
        .await
    }

    /// Updates due date and free-text fields of a draft.
    pub async fn update_details(
        &self,
        id: InvoiceId,
        changes: DetailsChanges,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Committed<()>, InvoiceError> {
        self.execute(id, |svc, invoice| {
            svc.update_details(invoice, changes, actor, now)
        })
        .await
    }

    /// Builds a reminder for an overdue invoice. Nothing is written.
    pub async fn send_reminder(
        &self,
        id: InvoiceId,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<PaymentReminder, InvoiceError> {
        let current = self.repository.load(id).await?;
        let reminder = self.service.send_reminder(&current.value, actor, now)?;
        info!(
            invoice_id = %id,
            days_overdue = reminder.days_overdue,
            remaining = %reminder.remaining,
            "Payment reminder requested"
        );
        Ok(reminder)
    }
}

fn log_transition(id: InvoiceId, outcome: &LifecycleOutcome) {
    for entry in &outcome.history {
        info!(
            invoice_id = %id,
            from = ?entry.from_status,
            to = %entry.to_status,
            system = entry.actor.is_none(),
            "Invoice status changed"
        );
    }
}
