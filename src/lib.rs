//! Phase-gated single election workflow
//!
//! An administrator registers voters, voters submit proposals and cast one
//! vote each, and the tally picks the proposal with the most votes (ties go
//! to the lowest proposal id).

pub mod config;
pub mod errors;
pub mod types;
pub mod workflow;

// Re-export commonly used types
pub use errors::{Error, ErrorKind, Result, Role};
pub use types::{Principal, Proposal, ProposalId, TallyResult, Voter, WorkflowStatus};
pub use workflow::{Election, ElectionEvent, ElectionService, EventRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging for the election workflow from `LOG_LEVEL`/`LOG_FORMAT`
pub fn init() -> Result<()> {
    init_with(&config::LoggingConfig::from_env())
}

/// Initialize logging with an explicit configuration
///
/// `RUST_LOG` still takes precedence over `logging.level` when set.
pub fn init_with(logging: &config::LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter_directive().into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match logging.log_format()? {
        config::LogFormat::Json => builder.json().try_init(),
        config::LogFormat::Pretty => builder.pretty().try_init(),
        config::LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| internal_error!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("🗳️  Election workflow v{} initialized", VERSION);
    Ok(())
}
