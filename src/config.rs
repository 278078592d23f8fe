//! Configuration management for the voting core
//!
//! Loads admin credentials, tally polling and logging settings from
//! environment variables (a `.env` file is honored when present).

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{Error, Result, config_error};

/// Default tally polling interval in milliseconds
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Static admin credentials gating candidate management and resets
#[derive(Clone)]
pub struct AdminConfig {
    pub username: String,

    /// Wiped from memory when the config is dropped
    pub password: Zeroizing<String>,
}

impl AdminConfig {
    /// Build credentials, trimming the username the way logins compare it
    pub fn new(username: &str, password: impl Into<String>) -> Result<Self> {
        let username = username.trim();
        let password = Zeroizing::new(password.into());

        if username.is_empty() {
            return Err(config_error!("VOTE_ADMIN_USER must not be empty"));
        }
        if password.is_empty() {
            return Err(config_error!("VOTE_ADMIN_PASS must not be empty"));
        }

        Ok(Self {
            username: username.to_string(),
            password,
        })
    }

    /// Load admin credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let username = std::env::var("VOTE_ADMIN_USER").unwrap_or_else(|_| "admin".to_string());
        let password = std::env::var("VOTE_ADMIN_PASS").unwrap_or_else(|_| "admin123".to_string());

        let config = Self::new(&username, password)?;
        if config.password.as_str() == "admin123" {
            tracing::warn!("Using default admin password, set VOTE_ADMIN_PASS");
        }

        Ok(config)
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Live tally refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    /// How often the tally watcher re-reads the ballot store
    pub poll_interval_ms: u64,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl TallyConfig {
    /// Load tally settings from environment variables
    pub fn from_env() -> Result<Self> {
        let poll_interval_ms = parse_or("VOTE_TALLY_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        let config = Self { poll_interval_ms };
        config.validate()?;
        Ok(config)
    }

    /// Reject a zero interval, which would busy-loop the watcher
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(config_error!("VOTE_TALLY_POLL_INTERVAL_MS must be greater than zero"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(config_error!("Invalid LOG_FORMAT '{}'", s)),
        }
    }
}

impl LoggingConfig {
    /// Load logging settings from environment variables
    pub fn from_env() -> Result<Self> {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let format = match std::env::var("LOG_FORMAT") {
            Ok(value) => value.parse()?,
            Err(_) => LogFormat::Pretty,
        };

        Ok(Self { level, format })
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub admin: AdminConfig,
    pub tally: TallyConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            admin: AdminConfig::from_env()?,
            tally: TallyConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        Self {
            admin: AdminConfig {
                username: "admin".to_string(),
                password: Zeroizing::new("test-password".to_string()),
            },
            tally: TallyConfig {
                poll_interval_ms: 20, // Fast polling for tests
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}

fn parse_or(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(value) => parse_u64(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse_u64(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| config_error!("Invalid {}: '{}'", name, value))
}
