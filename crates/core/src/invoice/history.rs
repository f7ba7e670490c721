//! Append-only status history.

use chrono::{DateTime, Utc};

use factura_shared::types::UserId;

use crate::invoice::status::InvoiceStatus;
use crate::invoice::types::{Invoice, StatusHistoryEntry};

/// Records audit trail entries on an invoice.
pub struct HistoryRecorder;

impl HistoryRecorder {
    /// Appends one entry and returns a copy of it.
    ///
    /// Existing entries are never touched. Timestamps are clamped so the trail
    /// stays non-decreasing even if the caller's clock steps backwards.
    pub fn append(
        invoice: &mut Invoice,
        from_status: Option<InvoiceStatus>,
        to_status: InvoiceStatus,
        actor: Option<UserId>,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> StatusHistoryEntry {
        let history = invoice.status_history();
        let created_at = history
            .last()
            .map_or(now, |last| last.created_at.max(now));
        let sequence = u32::try_from(history.len()).map_or(u32::MAX, |n| n.saturating_add(1));

        let entry = StatusHistoryEntry {
            sequence,
            from_status,
            to_status,
            comment: comment
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            actor,
            created_at,
        };
        invoice.push_history(entry.clone());
        entry
    }
}
