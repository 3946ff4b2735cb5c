//! Error types for the invite ledger.

use crate::ids::UserId;
use crate::platform::PlatformError;
use thiserror::Error;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ledger operations.
///
/// The first group are business-rule rejections, reported back to the member
/// who issued the command. The rest are faults.
#[derive(Debug, Error)]
pub enum Error {
    /// Invoker does not hold the whitelist role
    #[error("you do not hold the whitelist role")]
    Unauthorized,

    /// Target is an automated account or not a guild member
    #[error("that account cannot be whitelisted")]
    InvalidTarget,

    /// Invoker tried to whitelist themselves
    #[error("you cannot whitelist yourself")]
    SelfInviteRejected,

    /// Target already holds the whitelist role
    #[error("{0} is already whitelisted")]
    AlreadyWhitelisted(UserId),

    /// Invoker has no invites left
    #[error("no invites left")]
    QuotaExhausted,

    /// Grant amount was not positive
    #[error("invite amount must be greater than zero (got {0})")]
    InvalidAmount(i64),

    /// Ledger committed but the platform refused or timed out on the role grant
    #[error("failed to grant the whitelist role to {target}: {reason}")]
    RoleGrantFailed { target: UserId, reason: String },

    /// Storage error
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Misconfiguration such as a missing whitelist role
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Platform query failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl Error {
    /// True for outcomes caused by the request rather than by the system.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized
                | Error::InvalidTarget
                | Error::SelfInviteRejected
                | Error::AlreadyWhitelisted(_)
                | Error::QuotaExhausted
                | Error::InvalidAmount(_)
        )
    }
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}
