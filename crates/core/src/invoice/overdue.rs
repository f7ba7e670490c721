//! Overdue classification.
//!
//! "Overdue" depends on the current day, so it is derived on every read and
//! never stored. Days are compared in one canonical timezone.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::invoice::status::InvoiceStatus;

/// Stateless overdue predicate.
pub struct OverdueClassifier;

impl OverdueClassifier {
    /// Returns true iff the invoice awaits payment and `due_date < today`.
    ///
    /// Drafts, paid, cancelled and refunded invoices are never overdue, nor is
    /// an invoice without a due date.
    #[must_use]
    pub fn is_overdue(
        status: InvoiceStatus,
        due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> bool {
        status.is_awaiting_payment() && due_date.is_some_and(|due| due < today)
    }

    /// Calendar day of `now` in the canonical timezone.
    #[must_use]
    pub fn today_in(timezone: Tz, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&timezone).date_naive()
    }

    /// Whole days elapsed since the due date, zero when not yet due.
    #[must_use]
    pub fn days_overdue(due_date: Option<NaiveDate>, today: NaiveDate) -> i64 {
        due_date.map_or(0, |due| (today - due).num_days().max(0))
    }

    /// Parses a stored due date.
    ///
    /// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, the latter converted to
    /// the canonical timezone first. Anything else yields `None`, which the
    /// classifier treats like a missing due date.
    #[must_use]
    pub fn parse_due_date(raw: &str, timezone: Tz) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&timezone).date_naive())
    }
}
