//! # DomainError
//!
//! Centralized error type shared by every port, service and adapter.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., Recipe, Review, User)
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Input rejected before touching storage
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid, expired or revoked credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (suspended, not owner, not admin)
    #[error("{0}")]
    Forbidden(String),

    /// Resource already exists (e.g., duplicate email, second review)
    #[error("{0}")]
    Conflict(String),

    /// Upload exceeds the configured limit
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound(entity, id.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A specialized Result type for LunchBox domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
