//! Environment-driven configuration

use crate::core::availability::{BlackoutParseError, BlackoutWindow};
use di::{inject, injectable};
use log::error;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://booking.db?mode=rwc";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Weekly windows in which no location can be booked, unless overridden
/// through `BLACKOUT_WINDOWS`.
pub const DEFAULT_BLACKOUT_WINDOWS: &str = "Mon 07:00-08:00;Fri 18:00-22:00";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`BIND_ADDRESS` is not a socket address: {0}")]
    BindAddress(#[from] std::net::AddrParseError),

    #[error("`BLACKOUT_WINDOWS` is invalid: {0}")]
    Blackout(#[from] BlackoutParseError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: SocketAddr,
    pub cors_origins: Vec<String>,
    pub blackout_windows: Vec<BlackoutWindow>,
    /// Emails that get the admin role when they sign up.
    pub admin_emails: Vec<String>,
    pub log_level: String,
}

impl AppConfig {
    /// Reads the configuration from the process environment, after loading
    /// `.env` if one exists.
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        dotenvy::dotenv().ok();

        let var = |name: &str, default: &str| env::var(name).unwrap_or_else(|_| default.to_owned());
        let list = |value: String| -> Vec<String> {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect()
        };

        Ok(AppConfig {
            database_url: var("DATABASE_URL", DEFAULT_DATABASE_URL),
            bind_address: var("BIND_ADDRESS", DEFAULT_BIND_ADDRESS).parse()?,
            cors_origins: list(var("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
            blackout_windows: BlackoutWindow::parse_list(&var(
                "BLACKOUT_WINDOWS",
                DEFAULT_BLACKOUT_WINDOWS,
            ))?,
            admin_emails: list(var("ADMIN_EMAILS", "")),
            log_level: var("LOG_LEVEL", DEFAULT_LOG_LEVEL),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            cors_origins: DEFAULT_CORS_ORIGINS.split(',').map(str::to_owned).collect(),
            blackout_windows: BlackoutWindow::parse_list(DEFAULT_BLACKOUT_WINDOWS)
                .unwrap_or_default(),
            admin_emails: Vec::new(),
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
        }
    }
}

/// Configuration as a DI singleton.
///
/// `main` validates the environment before the provider is built, so the
/// fallback to defaults only happens when the service runs without it (tests).
pub struct Settings {
    config: AppConfig,
}

#[injectable]
impl Settings {
    #[inject]
    pub fn create() -> Settings {
        let config = AppConfig::from_env().unwrap_or_else(|e| {
            error!("{e}, falling back to default configuration");
            AppConfig::default()
        });

        Settings { config }
    }
}

impl std::ops::Deref for Settings {
    type Target = AppConfig;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}
