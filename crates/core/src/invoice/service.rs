//! Invoice lifecycle service.
//!
//! Every operation checks the actor's capability first, then validates the
//! request against the current aggregate, and only then mutates it. A rejected
//! operation leaves the invoice exactly as it was.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use factura_shared::types::{InvoiceId, InvoiceItemId, Money, UserId};

use crate::invoice::capability::{Actor, Capability};
use crate::invoice::error::InvoiceError;
use crate::invoice::history::HistoryRecorder;
use crate::invoice::ledger::PaymentLedger;
use crate::invoice::overdue::OverdueClassifier;
use crate::invoice::status::{InvoiceStatus, StatusGraph};
use crate::invoice::totals::LineItemCalculator;
use crate::invoice::types::{
    ClientRef, DetailsChanges, Invoice, InvoiceItem, ItemChanges, NewInvoice, NewInvoiceItem,
    Payment, PaymentInput, StatusHistoryEntry,
};

/// Comment on the history entry written when a payment settles the invoice.
pub const AUTO_PAID_COMMENT: &str = "auto: fully paid";

/// Comment on the history entry written when a first payment leaves a balance.
pub const AUTO_PARTIALLY_PAID_COMMENT: &str = "auto: partially paid";

/// Business policy knobs of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Timezone in which "today" is determined.
    pub timezone: Tz,
    /// Whether `send` may resurrect a cancelled invoice.
    pub allow_resend_cancelled: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            allow_resend_cancelled: true,
        }
    }
}

/// Result of a status-changing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleOutcome {
    /// Status before the operation.
    pub previous_status: InvoiceStatus,
    /// Status after the operation.
    pub status: InvoiceStatus,
    /// History entries appended by the operation.
    pub history: Vec<StatusHistoryEntry>,
    /// Payment recorded by the operation.
    pub payment: Option<Payment>,
    /// Set when the invoice is paid while the ledger still shows a balance.
    ///
    /// This happens after a manual mark-paid override. The ledger is left
    /// as is; the caller decides how to surface the discrepancy.
    pub unreconciled_balance: Option<Decimal>,
}

/// A payment reminder ready to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReminder {
    /// Invoice the reminder is about.
    pub invoice_id: InvoiceId,
    /// Invoice number.
    pub invoice_number: String,
    /// Billed client.
    pub client: ClientRef,
    /// Outstanding balance.
    pub remaining: Money,
    /// Due date that was missed.
    pub due_date: Option<NaiveDate>,
    /// Whole days past the due date.
    pub days_overdue: i64,
    /// User who asked for the reminder.
    pub requested_by: Option<UserId>,
}

/// Orchestrates status changes, payments and draft editing on one invoice.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvoiceLifecycleService {
    policy: LifecyclePolicy,
}

impl InvoiceLifecycleService {
    /// Creates a service with the given policy.
    #[must_use]
    pub const fn new(policy: LifecyclePolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    #[must_use]
    pub const fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Calendar day of `now` in the policy timezone.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        OverdueClassifier::today_in(self.policy.timezone, now)
    }

    /// Creates a draft invoice and records its creation entry.
    pub fn create(
        &self,
        input: NewInvoice,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Invoice, InvoiceError> {
        actor.require(Capability::Create)?;

        if input.invoice_number.trim().is_empty() {
            return Err(InvoiceError::InvalidInvoice(
                "invoice number is required".to_string(),
            ));
        }
        if input.client.name.trim().is_empty() {
            return Err(InvoiceError::InvalidInvoice(
                "client name is required".to_string(),
            ));
        }
        if let Some(due) = input.due_date {
            if due < input.invoice_date {
                return Err(InvoiceError::InvalidInvoice(format!(
                    "due date {due} is before invoice date {}",
                    input.invoice_date
                )));
            }
        }

        let items = input
            .items
            .iter()
            .cloned()
            .map(|item| LineItemCalculator::snapshot(item, input.currency))
            .collect::<Result<Vec<_>, _>>()?;
        LineItemCalculator::checked_invoice_totals(&items, input.currency)?;

        let mut invoice = Invoice::draft(&input, now);
        *invoice.items_mut() = items;
        HistoryRecorder::append(
            &mut invoice,
            None,
            InvoiceStatus::Draft,
            actor.user_id(),
            None,
            now,
        );
        Ok(invoice)
    }

    /// Adds a line item to a draft.
    pub fn add_item(
        &self,
        invoice: &mut Invoice,
        item: NewInvoiceItem,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<InvoiceItem, InvoiceError> {
        actor.require(Capability::Update)?;
        ensure_editable(invoice)?;

        let snapshot = LineItemCalculator::snapshot(item, invoice.currency())?;
        let mut items = invoice.items().to_vec();
        items.push(snapshot.clone());
        LineItemCalculator::checked_invoice_totals(&items, invoice.currency())?;

        *invoice.items_mut() = items;
        invoice.touch(now);
        Ok(snapshot)
    }

    /// Updates a line item of a draft.
    pub fn update_item(
        &self,
        invoice: &mut Invoice,
        item_id: InvoiceItemId,
        changes: ItemChanges,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<InvoiceItem, InvoiceError> {
        actor.require(Capability::Update)?;
        ensure_editable(invoice)?;

        let index = item_index(invoice, item_id)?;
        let mut updated = invoice.items()[index].clone();
        if let Some(name) = changes.product_name {
            updated.product_name_snapshot = name.trim().to_string();
        }
        if let Some(sku) = changes.product_sku {
            updated.product_sku_snapshot =
                sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        }
        if let Some(quantity) = changes.quantity {
            updated.quantity = quantity;
        }
        if let Some(price) = changes.unit_price_ht {
            updated.unit_price_ht_snapshot = price;
        }
        if let Some(rate) = changes.tax_rate {
            updated.tax_rate_snapshot = rate;
        }
        LineItemCalculator::validate(&updated, invoice.currency())?;
        let mut items = invoice.items().to_vec();
        items[index] = updated.clone();
        LineItemCalculator::checked_invoice_totals(&items, invoice.currency())?;

        *invoice.items_mut() = items;
        invoice.touch(now);
        Ok(updated)
    }

    /// Removes a line item from a draft.
    pub fn remove_item(
        &self,
        invoice: &mut Invoice,
        item_id: InvoiceItemId,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<InvoiceItem, InvoiceError> {
        actor.require(Capability::Update)?;
        ensure_editable(invoice)?;

        let index = item_index(invoice, item_id)?;
        let removed = invoice.items_mut().remove(index);
        invoice.touch(now);
        Ok(removed)
    }

    /// Updates due date and free-text fields of a draft.
    pub fn update_details(
        &self,
        invoice: &mut Invoice,
        changes: DetailsChanges,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), InvoiceError> {
        actor.require(Capability::Update)?;
        ensure_editable(invoice)?;

        if let Some(Some(due)) = changes.due_date {
            if due < invoice.invoice_date() {
                return Err(InvoiceError::InvalidInvoice(format!(
                    "due date {due} is before invoice date {}",
                    invoice.invoice_date()
                )));
            }
        }

        invoice.apply_details(changes);
        invoice.touch(now);
        Ok(())
    }

    /// Checks that the invoice may be deleted by the actor.
    ///
    /// Only drafts without payments can be deleted.
    pub fn ensure_deletable(&self, invoice: &Invoice, actor: &Actor) -> Result<(), InvoiceError> {
        actor.require(Capability::Delete)?;

        if invoice.status() != InvoiceStatus::Draft {
            return Err(InvoiceError::DeletionRejected(format!(
                "invoice is {}",
                invoice.status()
            )));
        }
        if !invoice.payments().is_empty() {
            return Err(InvoiceError::DeletionRejected(format!(
                "invoice has {} recorded payment(s)",
                invoice.payments().len()
            )));
        }
        Ok(())
    }

    /// Moves the invoice along one edge of the status graph.
    pub fn change_status(
        &self,
        invoice: &mut Invoice,
        target: InvoiceStatus,
        comment: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<LifecycleOutcome, InvoiceError> {
        actor.require(Capability::ChangeStatus)?;

        let from = invoice.status();
        if !StatusGraph::is_transition_allowed(from, target) {
            return Err(InvoiceError::IllegalTransition { from, to: target });
        }

        let entry = transition(invoice, target, actor.user_id(), comment, now);
        Ok(outcome(invoice, from, vec![entry], None))
    }

    /// Sends a draft, or re-sends a cancelled invoice when the policy allows it.
    pub fn send(
        &self,
        invoice: &mut Invoice,
        comment: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<LifecycleOutcome, InvoiceError> {
        actor.require(Capability::Send)?;

        let from = invoice.status();
        match from {
            InvoiceStatus::Draft => {
                if !StatusGraph::is_transition_allowed(from, InvoiceStatus::Sent) {
                    return Err(InvoiceError::IllegalTransition {
                        from,
                        to: InvoiceStatus::Sent,
                    });
                }
            }
            InvoiceStatus::Cancelled if self.policy.allow_resend_cancelled => {}
            InvoiceStatus::Cancelled => return Err(InvoiceError::TerminalState(from)),
            _ => {
                return Err(InvoiceError::IllegalTransition {
                    from,
                    to: InvoiceStatus::Sent,
                });
            }
        }

        let entry = transition(invoice, InvoiceStatus::Sent, actor.user_id(), comment, now);
        Ok(outcome(invoice, from, vec![entry], None))
    }

    /// Forces the invoice to paid without touching the ledger.
    ///
    /// Valid while the invoice awaits payment (or is overdue). Any remaining
    /// balance is reported in `unreconciled_balance`.
    pub fn mark_paid(
        &self,
        invoice: &mut Invoice,
        comment: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<LifecycleOutcome, InvoiceError> {
        actor.require(Capability::MarkPaid)?;

        let from = invoice.status();
        if from.is_terminal() {
            return Err(InvoiceError::TerminalState(from));
        }
        let eligible = from.is_awaiting_payment() || invoice.is_overdue(self.today(now));
        if !eligible || !StatusGraph::is_transition_allowed(from, InvoiceStatus::Paid) {
            return Err(InvoiceError::IllegalTransition {
                from,
                to: InvoiceStatus::Paid,
            });
        }

        let entry = transition(invoice, InvoiceStatus::Paid, actor.user_id(), comment, now);
        Ok(outcome(invoice, from, vec![entry], None))
    }

    /// Resets a refunded invoice to draft.
    ///
    /// Payments are kept for audit but voided, so the draft owes its full total again.
    pub fn reopen(
        &self,
        invoice: &mut Invoice,
        comment: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<LifecycleOutcome, InvoiceError> {
        actor.require(Capability::Reopen)?;

        let from = invoice.status();
        let Some(target) = StatusGraph::reopen_target(from) else {
            return Err(InvoiceError::IllegalTransition {
                from,
                to: InvoiceStatus::Draft,
            });
        };

        invoice.void_payments(now);
        let entry = transition(invoice, target, actor.user_id(), comment, now);
        Ok(outcome(invoice, from, vec![entry], None))
    }

    /// Records a payment and applies the status change it induces.
    ///
    /// The induced transition is attributed to the system, not the actor.
    pub fn record_payment(
        &self,
        invoice: &mut Invoice,
        input: PaymentInput,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<LifecycleOutcome, InvoiceError> {
        actor.require(Capability::RecordPayment)?;

        let from = invoice.status();
        let recorded = PaymentLedger::record_payment(invoice, input, actor.user_id(), now)?;

        let mut history = Vec::new();
        if let Some(target) = recorded.auto_transition {
            let comment = match target {
                InvoiceStatus::Paid => AUTO_PAID_COMMENT,
                _ => AUTO_PARTIALLY_PAID_COMMENT,
            };
            history.push(transition(
                invoice,
                target,
                None,
                Some(comment.to_string()),
                now,
            ));
        }

        Ok(outcome(invoice, from, history, Some(recorded.payment)))
    }

    /// Builds a reminder for an overdue invoice. Does not mutate anything.
    pub fn send_reminder(
        &self,
        invoice: &Invoice,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<PaymentReminder, InvoiceError> {
        actor.require(Capability::Send)?;

        let today = self.today(now);
        if !invoice.is_overdue(today) {
            return Err(InvoiceError::NotOverdue);
        }

        Ok(PaymentReminder {
            invoice_id: invoice.id(),
            invoice_number: invoice.invoice_number().to_string(),
            client: invoice.client().clone(),
            remaining: Money::new(invoice.collectible_amount(), invoice.currency()),
            due_date: invoice.due_date(),
            days_overdue: OverdueClassifier::days_overdue(invoice.due_date(), today),
            requested_by: actor.user_id(),
        })
    }
}

fn ensure_editable(invoice: &Invoice) -> Result<(), InvoiceError> {
    if invoice.status().is_editable() {
        Ok(())
    } else {
        Err(InvoiceError::NotEditable(invoice.status()))
    }
}

fn item_index(invoice: &Invoice, item_id: InvoiceItemId) -> Result<usize, InvoiceError> {
    invoice
        .items()
        .iter()
        .position(|item| item.id == item_id)
        .ok_or(InvoiceError::ItemNotFound(item_id))
}

fn transition(
    invoice: &mut Invoice,
    to: InvoiceStatus,
    actor: Option<UserId>,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> StatusHistoryEntry {
    let from = invoice.status();
    invoice.set_status(to, now);
    HistoryRecorder::append(invoice, Some(from), to, actor, comment, now)
}

fn outcome(
    invoice: &Invoice,
    previous_status: InvoiceStatus,
    history: Vec<StatusHistoryEntry>,
    payment: Option<Payment>,
) -> LifecycleOutcome {
    let remaining = invoice.remaining_amount();
    let unreconciled_balance = (invoice.status() == InvoiceStatus::Paid
        && remaining > Decimal::ZERO)
        .then_some(remaining);

    LifecycleOutcome {
        previous_status,
        status: invoice.status(),
        history,
        payment,
        unreconciled_balance,
    }
}
