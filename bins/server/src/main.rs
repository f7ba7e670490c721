//! Factura API Server
//!
//! Main entry point for the invoice lifecycle service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use factura_api::{
    AppState, create_router,
    reminder::{EmailReminderDispatcher, LogReminderDispatcher, ReminderDispatcher},
};
use factura_core::invoice::{InvoiceLifecycleService, LifecyclePolicy};
use factura_shared::{AppConfig, EmailService, JwtService};
use factura_store::{InMemoryInvoiceStore, InvoiceCommands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "factura=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let policy = LifecyclePolicy {
        timezone: config.invoicing.timezone,
        allow_resend_cancelled: config.invoicing.allow_resend_cancelled,
    };
    info!(
        timezone = %policy.timezone,
        allow_resend_cancelled = policy.allow_resend_cancelled,
        number_prefix = %config.invoicing.number_prefix,
        "Invoice lifecycle configured"
    );

    let commands = InvoiceCommands::new(
        Arc::new(InMemoryInvoiceStore::new()),
        InvoiceLifecycleService::new(policy),
        config.invoicing.number_prefix.clone(),
    );

    let reminders: Arc<dyn ReminderDispatcher> = match config.email.clone() {
        Some(email) => {
            info!(
                smtp_host = %email.smtp_host,
                smtp_port = %email.smtp_port,
                "Reminder emails enabled"
            );
            Arc::new(EmailReminderDispatcher::new(EmailService::new(email)))
        }
        None => {
            info!("No SMTP settings; reminders are logged only");
            Arc::new(LogReminderDispatcher)
        }
    };

    let state = AppState {
        commands,
        jwt_service: Arc::new(JwtService::new(&config.jwt)),
        reminders,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
