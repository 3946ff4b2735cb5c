//! Error types for the bot service.

use gatehouse_ledger::PlatformError;
use thiserror::Error;

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the bot.
#[derive(Debug, Error)]
pub enum Error {
    /// Ledger or business-rule error
    #[error(transparent)]
    Ledger(#[from] gatehouse_ledger::Error),

    /// Platform request failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// The platform rejected our credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
