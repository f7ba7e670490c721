//! Application configuration management.

use chrono_tz::Tz;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Invoice lifecycle settings.
    #[serde(default)]
    pub invoicing: InvoicingConfig,
    /// SMTP settings for payment reminders. Reminders are only logged when absent.
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Invoice lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    /// Canonical timezone used to decide which calendar day "today" is.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    /// Whether `send` may revive a cancelled invoice.
    #[serde(default = "default_allow_resend_cancelled")]
    pub allow_resend_cancelled: bool,
    /// Prefix for generated invoice numbers.
    #[serde(default = "default_number_prefix")]
    pub number_prefix: String,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            allow_resend_cancelled: default_allow_resend_cancelled(),
            number_prefix: default_number_prefix(),
        }
    }
}

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_allow_resend_cancelled() -> bool {
    true
}

fn default_number_prefix() -> String {
    "INV".to_string()
}

/// SMTP configuration for outgoing reminder emails.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    pub smtp_username: String,
    /// SMTP password.
    pub smtp_password: String,
    /// Sender address.
    pub from_email: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Factura".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("FACTURA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_applies_defaults() {
        temp_env::with_vars(
            [
                ("FACTURA__JWT__SECRET", Some("test-secret")),
                ("FACTURA__INVOICING__TIMEZONE", None::<&str>),
                ("FACTURA__SERVER__PORT", None),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.jwt.secret, "test-secret");
                assert_eq!(config.jwt.access_token_expiry_secs, 900);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.invoicing.timezone, Tz::UTC);
                assert!(config.invoicing.allow_resend_cancelled);
                assert_eq!(config.invoicing.number_prefix, "INV");
                assert!(config.email.is_none());
            },
        );
    }

    #[test]
    fn test_load_reads_invoicing_overrides() {
        temp_env::with_vars(
            [
                ("FACTURA__JWT__SECRET", Some("test-secret")),
                ("FACTURA__INVOICING__TIMEZONE", Some("Africa/Casablanca")),
                ("FACTURA__INVOICING__ALLOW_RESEND_CANCELLED", Some("false")),
                ("FACTURA__SERVER__PORT", Some("9090")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.invoicing.timezone, Tz::Africa__Casablanca);
                assert!(!config.invoicing.allow_resend_cancelled);
                assert_eq!(config.server.port, 9090);
            },
        );
    }

    #[test]
    fn test_load_fails_without_jwt_secret() {
        temp_env::with_var_unset("FACTURA__JWT__SECRET", || {
            assert!(AppConfig::load().is_err());
        });
    }
}
