//! Error types for the MAC address allocator.
//!
//! Every variant maps to a stable numeric code (see [`MacError::code`]) so
//! provisioning scripts can tell a missing base address apart from an
//! exhausted pool without parsing messages.

use thiserror::Error;

/// Result alias used throughout nextmac.
pub type MacResult<T> = Result<T, MacError>;

/// Errors that can occur while allocating or managing MAC addresses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MacError {
    /// Caller supplied an empty or unusable interface name.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The device base address could not be read.
    #[error("base address unavailable: {0}")]
    BaseUnavailable(String),

    /// Quota configuration cannot produce a valid whitelist.
    #[error("invalid pool configuration: {0}")]
    PoolConfigInvalid(String),

    /// No quota-eligible, unused address could be found.
    #[error("address pool exhausted: {0}")]
    PoolExhausted(String),

    /// A persisted address or record failed structural validation.
    #[error("malformed record: {0}")]
    Format(String),

    /// File open/read/write/rename failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The allocator lock could not be obtained in time.
    #[error("allocator busy: {0}")]
    Busy(String),

    /// The requested interface has no persisted assignment.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid options or configuration file.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MacError {
    /// Stable numeric code for this error kind.
    ///
    /// These values are part of the CLI contract and must never be renumbered.
    pub fn code(&self) -> i32 {
        match self {
            MacError::InvalidInput(_) => 2,
            MacError::BaseUnavailable(_) => 3,
            MacError::PoolConfigInvalid(_) => 4,
            MacError::PoolExhausted(_) => 5,
            MacError::Format(_) => 6,
            MacError::Storage(_) => 7,
            MacError::Busy(_) => 8,
            MacError::NotFound(_) => 9,
            MacError::Config(_) => 10,
        }
    }
}
