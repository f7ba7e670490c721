//! Shared types, errors, and configuration for Factura.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision
//! - Typed IDs for type-safe entity references
//! - Error types shared by the API layer
//! - Configuration management
//! - Access token claims and JWT handling
//! - SMTP delivery of payment reminders

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, EmailConfig, InvoicingConfig, JwtConfig};
pub use email::{EmailError, EmailService, ReminderEmail};
pub use error::AppError;
pub use jwt::{JwtError, JwtService};
