//! Capabilities and the acting principal.
//!
//! Capabilities come from the authorization subsystem as plain strings. The
//! lifecycle service checks exactly one capability per operation and never
//! looks at roles.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use factura_shared::types::UserId;

use crate::invoice::error::InvoiceError;

/// A permission gate on one invoice operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Create invoices.
    Create,
    /// Edit draft items and details.
    Update,
    /// Delete draft invoices.
    Delete,
    /// Generic status change.
    ChangeStatus,
    /// Send an invoice or a payment reminder.
    Send,
    /// Force an invoice to paid.
    MarkPaid,
    /// Reopen a refunded invoice.
    Reopen,
    /// Record a payment.
    RecordPayment,
}

impl Capability {
    /// Returns the capability string understood by the authorization subsystem.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "invoice:create",
            Self::Update => "invoice:update",
            Self::Delete => "invoice:delete",
            Self::ChangeStatus => "invoice:change-status",
            Self::Send => "invoice:send",
            Self::MarkPaid => "invoice:mark-paid",
            Self::Reopen => "invoice:reopen",
            Self::RecordPayment => "invoice:record-payment",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The principal performing an operation.
///
/// A `None` user means the system itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    user_id: Option<UserId>,
    capabilities: BTreeSet<String>,
}

impl Actor {
    /// Creates an actor for a user with the given capability strings.
    #[must_use]
    pub fn user<I, S>(user_id: UserId, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id: Some(user_id),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates the system actor holding every capability.
    #[must_use]
    pub fn system() -> Self {
        Self {
            user_id: None,
            capabilities: [
                Capability::Create,
                Capability::Update,
                Capability::Delete,
                Capability::ChangeStatus,
                Capability::Send,
                Capability::MarkPaid,
                Capability::Reopen,
                Capability::RecordPayment,
            ]
            .iter()
            .map(|c| c.as_str().to_string())
            .collect(),
        }
    }

    /// The acting user, `None` for the system.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Returns true if the actor holds the capability.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability.as_str())
    }

    /// Fails with `Unauthorized` unless the actor holds the capability.
    pub fn require(&self, capability: Capability) -> Result<(), InvoiceError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(InvoiceError::Unauthorized(capability))
        }
    }
}
