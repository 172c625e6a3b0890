//! # DomainError
//!
//! Centralized error handling for the Emberhall core.
//! Every fallible boundary surfaces one of these; nothing is silently
//! swallowed into a generic success.

use thiserror::Error;

/// The primary error type for all core operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Resource not found (e.g., store item, redeem, account, session)
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Role or ownership check failed
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Spend exceeds balance; the only caller-recoverable spend failure
    #[error("insufficient funds for cost {0}")]
    InsufficientFunds(i64),

    /// Duplicate purchase of an item already in the inventory
    #[error("already owned: {0}")]
    AlreadyOwned(String),

    /// Underlying store call failed; the only class callers may retry
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Malformed request payload
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl DomainError {
    /// Wraps an adapter-level failure as `StorageUnavailable`.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        DomainError::StorageUnavailable(err.to_string())
    }
}

/// A specialized Result type for Emberhall core logic.
pub type Result<T> = std::result::Result<T, DomainError>;
