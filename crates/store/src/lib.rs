//! Invoice persistence for Factura.
//!
//! The repository trait is the storage boundary. `InvoiceCommands` wraps each
//! lifecycle operation in a load / apply / save cycle guarded by the stored
//! version, so concurrent writers on one invoice cannot both commit.
//!
//! # Modules
//!
//! - `repository` - Storage trait and versioned snapshots
//! - `memory` - In-memory implementation
//! - `commands` - Unit-of-work command handlers

pub mod commands;
pub mod memory;
pub mod repository;

pub use commands::{Committed, InvoiceCommands};
pub use memory::InMemoryInvoiceStore;
pub use repository::{InvoiceRepository, Versioned};
