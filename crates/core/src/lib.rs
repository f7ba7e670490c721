//! Core business logic for Factura.
//!
//! This crate contains pure business logic with ZERO web or storage dependencies.
//! The invoice aggregate, its state machine, totals, payment ledger and audit
//! trail all live here. Callers pass in the current time and the acting
//! principal; nothing here reads a clock or performs I/O.
//!
//! # Modules
//!
//! - `invoice` - Invoice lifecycle and payment reconciliation

pub mod invoice;
