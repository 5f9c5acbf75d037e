//! Domain error model.

use thiserror::Error;

use crate::id::DrugId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is a deterministic business failure reported synchronously to
/// the caller. None of them leave partially applied state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Add-drug input failed validation (e.g. empty name, negative stock).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation targeted a drug id that is not in the inventory.
    #[error("drug not found: {0}")]
    NotFound(DrugId),

    /// A stock adjustment quantity was zero or negative.
    #[error("invalid quantity: {0} (must be positive)")]
    InvalidQuantity(i64),

    /// A decrease asked for more units than are on hand.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u64, available: u64 },

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The record already exists.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(id: DrugId) -> Self {
        Self::NotFound(id)
    }

    pub fn insufficient_stock(requested: u64, available: u64) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    /// Short, stable name of the error kind, suitable for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::InvalidQuantity(_) => "invalid_quantity",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::InvalidId(_) => "invalid_id",
            Self::Conflict(_) => "conflict",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = DomainError::insufficient_stock(200, 150);
        assert_eq!(
            err.to_string(),
            "insufficient stock: requested 200, available 150"
        );

        let err = DomainError::InvalidQuantity(0);
        assert_eq!(err.to_string(), "invalid quantity: 0 (must be positive)");
    }

    #[test]
    fn kind_is_stable() {
        assert_eq!(DomainError::validation("x").kind(), "validation");
        assert_eq!(DomainError::not_found(DrugId::new()).kind(), "not_found");
        assert_eq!(DomainError::conflict("x").kind(), "conflict");
    }
}
