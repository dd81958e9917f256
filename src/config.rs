//! Configuration management for the election workflow
//!
//! Loads settings from environment variables (and a `.env` file if present)
//! with validation.

use crate::types::Principal;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default upper bound on proposal description length, in bytes
pub const DEFAULT_MAX_DESCRIPTION_LEN: usize = 256;

/// Default capacity of the notification channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Settings of a single election round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Principal allowed to register voters, move phases and tally
    pub administrator: Principal,

    /// Longest accepted proposal description, in bytes
    pub max_description_len: usize,

    /// Buffered notifications per subscriber before it starts lagging
    pub event_channel_capacity: usize,
}

impl ElectionConfig {
    /// Load election configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let administrator = std::env::var("ELECTION_ADMIN")
            .map_err(|_| Error::configuration("ELECTION_ADMIN environment variable required"))?
            .parse::<Principal>()
            .map_err(|_| Error::configuration("ELECTION_ADMIN must be a 0x-prefixed 20 byte address"))?;

        let max_description_len = std::env::var("ELECTION_MAX_DESCRIPTION_LEN")
            .unwrap_or_else(|_| DEFAULT_MAX_DESCRIPTION_LEN.to_string())
            .parse::<usize>()
            .map_err(|_| Error::configuration("Invalid ELECTION_MAX_DESCRIPTION_LEN"))?;

        let event_channel_capacity = std::env::var("ELECTION_EVENT_CHANNEL_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_EVENT_CHANNEL_CAPACITY.to_string())
            .parse::<usize>()
            .map_err(|_| Error::configuration("Invalid ELECTION_EVENT_CHANNEL_CAPACITY"))?;

        let config = Self {
            administrator,
            max_description_len,
            event_channel_capacity,
        };
        config.validate()?;

        Ok(config)
    }

    /// Configuration with the given administrator and default limits
    pub fn new(administrator: Principal) -> Self {
        Self {
            administrator,
            max_description_len: DEFAULT_MAX_DESCRIPTION_LEN,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Create configuration for testing with a random administrator
    pub fn for_testing() -> Self {
        Self::new(Principal::random())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_description_len == 0 {
            return Err(Error::configuration(
                "ELECTION_MAX_DESCRIPTION_LEN must be greater than zero",
            ));
        }

        // tokio's broadcast channel panics on a zero capacity
        if self.event_channel_capacity == 0 {
            return Err(Error::configuration(
                "ELECTION_EVENT_CHANNEL_CAPACITY must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub election: ElectionConfig,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LoggingConfig {
    /// Load from `LOG_LEVEL` and `LOG_FORMAT`
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        }
    }

    pub fn log_format(&self) -> Result<LogFormat> {
        match self.format.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(Error::configuration(format!("Unknown LOG_FORMAT: {other}"))),
        }
    }

    /// Filter directive used when `RUST_LOG` is not set
    pub fn filter_directive(&self) -> String {
        format!("election={}", self.level)
    }
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        let election = ElectionConfig::from_env()?;
        let logging = LoggingConfig::from_env();
        logging.log_format()?;

        Ok(Self { election, logging })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        };

        Self {
            election: ElectionConfig::for_testing(),
            logging,
        }
    }
}
