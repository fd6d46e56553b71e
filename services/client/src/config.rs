//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::time::Duration;
use tracing::Level;
use url::Url;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The identity the local provider signs in as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalIdentity {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base: String,
    pub http_timeout: Duration,
    pub log_level: Level,
    pub identity: Option<LocalIdentity>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Profile Store Settings ---
        let api_base_str = std::env::var("PEERCONNECT_API_BASE")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        let api_base = parse_api_base(&api_base_str)?;

        let http_timeout = match std::env::var("PEERCONNECT_HTTP_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw.parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "PEERCONNECT_HTTP_TIMEOUT_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", raw),
                    )
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(30),
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Local Identity (optional) ---
        let identity = match std::env::var("PEERCONNECT_USER_EMAIL") {
            Ok(email) if !email.trim().is_empty() => Some(LocalIdentity {
                user_id: std::env::var("PEERCONNECT_USER_ID")
                    .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string()),
                email: email.trim().to_string(),
                display_name: std::env::var("PEERCONNECT_DISPLAY_NAME").ok(),
            }),
            _ => {
                if std::env::var("PEERCONNECT_USER_ID").is_ok() {
                    return Err(ConfigError::MissingVar("PEERCONNECT_USER_EMAIL".to_string()));
                }
                None
            }
        };

        Ok(Self {
            api_base,
            http_timeout,
            log_level,
            identity,
        })
    }
}

fn parse_api_base(raw: &str) -> Result<String, ConfigError> {
    let invalid = |why: String| ConfigError::InvalidValue("PEERCONNECT_API_BASE".to_string(), why);
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "PEERCONNECT_API_BASE",
        "PEERCONNECT_HTTP_TIMEOUT_SECS",
        "RUST_LOG",
        "PEERCONNECT_USER_EMAIL",
        "PEERCONNECT_USER_ID",
        "PEERCONNECT_DISPLAY_NAME",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_environment() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_base, "http://127.0.0.1:8000");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.identity.is_none());
    }

    #[test]
    #[serial]
    fn api_base_loses_trailing_slash() {
        clear_env();
        std::env::set_var("PEERCONNECT_API_BASE", "https://api.example.com/");
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_base, "https://api.example.com");
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_non_http_api_base() {
        clear_env();
        std::env::set_var("PEERCONNECT_API_BASE", "ftp://files.example.com");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(var, _)) if var == "PEERCONNECT_API_BASE"
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_zero_timeout() {
        clear_env();
        std::env::set_var("PEERCONNECT_HTTP_TIMEOUT_SECS", "0");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn identity_gets_generated_user_id() {
        clear_env();
        std::env::set_var("PEERCONNECT_USER_EMAIL", "alice@example.com");
        let identity = Config::from_env().unwrap().identity.unwrap();
        assert_eq!(identity.email, "alice@example.com");
        assert!(!identity.user_id.is_empty());
        assert!(identity.display_name.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn user_id_without_email_is_an_error() {
        clear_env();
        std::env::set_var("PEERCONNECT_USER_ID", "u-1");
        assert!(matches!(Config::from_env(), Err(ConfigError::MissingVar(_))));
        clear_env();
    }
}
