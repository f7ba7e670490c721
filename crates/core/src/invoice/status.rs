//! Invoice status and the transition graph.
//!
//! This is the single place that knows which status may follow which.
//! Presentation layers read labels and allowed targets from here instead of
//! keeping their own copies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Invoice status in the billing lifecycle.
///
/// The valid generic transitions are:
/// - Draft → Sent, Issued, Cancelled
/// - Sent → Issued, Paid, PartiallyPaid, Cancelled
/// - Issued → Paid, PartiallyPaid, Cancelled
/// - PartiallyPaid → Paid, Cancelled
/// - Paid → Refunded
///
/// Refunded → Draft exists only through the reopen operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being drafted, items can still change.
    Draft,
    /// Sent to the client.
    Sent,
    /// Issued as a binding document.
    Issued,
    /// Settled.
    Paid,
    /// Some payment received, balance outstanding.
    PartiallyPaid,
    /// Cancelled (terminal).
    Cancelled,
    /// Refunded (terminal for generic transitions).
    Refunded,
}

impl InvoiceStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Draft,
        Self::Sent,
        Self::Issued,
        Self::PartiallyPaid,
        Self::Paid,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Issued => "issued",
            Self::Paid => "paid",
            Self::PartiallyPaid => "partially_paid",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "issued" => Some(Self::Issued),
            "paid" => Some(Self::Paid),
            "partially_paid" => Some(Self::PartiallyPaid),
            "cancelled" => Some(Self::Cancelled),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::Issued => "Issued",
            Self::Paid => "Paid",
            Self::PartiallyPaid => "Partially paid",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
        }
    }

    /// Returns true for statuses without outgoing generic transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Returns true while line items may be edited.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true for statuses that await payment and can become overdue.
    #[must_use]
    pub const fn is_awaiting_payment(&self) -> bool {
        matches!(self, Self::Sent | Self::Issued | Self::PartiallyPaid)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static definition of the invoice state machine.
pub struct StatusGraph;

impl StatusGraph {
    /// Statuses reachable from `from` through a generic status change.
    #[must_use]
    pub const fn allowed_targets(from: InvoiceStatus) -> &'static [InvoiceStatus] {
        use InvoiceStatus::{Cancelled, Draft, Issued, Paid, PartiallyPaid, Refunded, Sent};

        match from {
            Draft => &[Sent, Issued, Cancelled],
            Sent => &[Issued, Paid, PartiallyPaid, Cancelled],
            Issued => &[Paid, PartiallyPaid, Cancelled],
            PartiallyPaid => &[Paid, Cancelled],
            Paid => &[Refunded],
            Cancelled | Refunded => &[],
        }
    }

    /// Check if a generic status transition is valid.
    #[must_use]
    pub fn is_transition_allowed(from: InvoiceStatus, to: InvoiceStatus) -> bool {
        Self::allowed_targets(from).contains(&to)
    }

    /// Target of the reopen operation, if `from` can be reopened.
    #[must_use]
    pub const fn reopen_target(from: InvoiceStatus) -> Option<InvoiceStatus> {
        match from {
            InvoiceStatus::Refunded => Some(InvoiceStatus::Draft),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use InvoiceStatus::{Cancelled, Draft, Issued, Paid, PartiallyPaid, Refunded, Sent};

    #[test]
    fn test_status_round_trips_through_parse() {
        for status in InvoiceStatus::ALL {
            assert_eq!(InvoiceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InvoiceStatus::parse("PARTIALLY_PAID"), Some(PartiallyPaid));
        assert_eq!(InvoiceStatus::parse("overdue"), None);
    }

    #[test]
    fn test_status_serde_matches_as_str() {
        for status in InvoiceStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[rstest]
    #[case(Draft, Sent, true)]
    #[case(Draft, Issued, true)]
    #[case(Draft, Cancelled, true)]
    #[case(Draft, Paid, false)]
    #[case(Draft, PartiallyPaid, false)]
    #[case(Sent, Issued, true)]
    #[case(Sent, Paid, true)]
    #[case(Sent, PartiallyPaid, true)]
    #[case(Sent, Cancelled, true)]
    #[case(Sent, Draft, false)]
    #[case(Issued, Paid, true)]
    #[case(Issued, Sent, false)]
    #[case(PartiallyPaid, Paid, true)]
    #[case(PartiallyPaid, Cancelled, true)]
    #[case(PartiallyPaid, Issued, false)]
    #[case(Paid, Refunded, true)]
    #[case(Paid, Cancelled, false)]
    #[case(Cancelled, Sent, false)]
    #[case(Cancelled, Draft, false)]
    #[case(Refunded, Draft, false)]
    fn test_is_transition_allowed(
        #[case] from: InvoiceStatus,
        #[case] to: InvoiceStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(StatusGraph::is_transition_allowed(from, to), expected);
    }

    #[test]
    fn test_no_self_transitions() {
        for status in InvoiceStatus::ALL {
            assert!(!StatusGraph::is_transition_allowed(status, status));
        }
    }

    #[test]
    fn test_terminal_states_have_no_targets() {
        for status in InvoiceStatus::ALL {
            assert_eq!(
                status.is_terminal(),
                StatusGraph::allowed_targets(status).is_empty()
            );
        }
    }

    #[test]
    fn test_reopen_target() {
        assert_eq!(StatusGraph::reopen_target(Refunded), Some(Draft));
        assert_eq!(StatusGraph::reopen_target(Cancelled), None);
        assert_eq!(StatusGraph::reopen_target(Paid), None);
    }

    #[test]
    fn test_awaiting_payment() {
        assert!(Sent.is_awaiting_payment());
        assert!(Issued.is_awaiting_payment());
        assert!(PartiallyPaid.is_awaiting_payment());
        assert!(!Draft.is_awaiting_payment());
        assert!(!Paid.is_awaiting_payment());
    }
}
