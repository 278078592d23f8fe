//! Single-election voting core
//!
//! One-time voter codes, one vote per voter per position, and live tallies,
//! on top of a transactional store that enforces the uniqueness rules.

pub mod config;
pub mod errors;
pub mod integrity;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use errors::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default filter
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vote_integrity=info".into()),
        )
        .try_init()
        .map_err(|e| Error::internal(format!("logging already initialized: {e}")))?;

    tracing::info!("🗳️  Voting core v{} initialized", VERSION);
    Ok(())
}

/// Initialize logging from [`config::LoggingConfig`]
///
/// `RUST_LOG` still wins over the configured level when set.
pub fn init_with(logging: &config::LoggingConfig) -> Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&logging.level)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match logging.format {
        config::LogFormat::Json => builder.json().try_init(),
        config::LogFormat::Pretty => builder.try_init(),
    };
    installed.map_err(|e| Error::internal(format!("logging already initialized: {e}")))?;

    tracing::info!("🗳️  Voting core v{} initialized", VERSION);
    Ok(())
}

/// Filter for this crate's events at `level`
fn level_filter(level: &str) -> Result<tracing_subscriber::EnvFilter> {
    tracing_subscriber::EnvFilter::try_new(format!("vote_integrity={level}"))
        .map_err(|e| config_error!("Invalid LOG_LEVEL '{}': {}", level, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogFormat, LoggingConfig};

    #[test]
    fn test_level_filter() {
        assert!(level_filter("debug").is_ok());
        assert!(level_filter("warn").is_ok());
        assert!(matches!(level_filter("loudest"), Err(Error::Config { .. })));
        assert!(matches!(level_filter("vote_integrity=[["), Err(Error::Config { .. })));
    }

    // The only test in this crate that installs the global subscriber
    #[test]
    fn test_init_with_json_then_reinit_fails() {
        let logging = LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Json,
        };

        assert!(init_with(&logging).is_ok());
        assert!(matches!(init(), Err(Error::Internal { .. })));
    }
}
