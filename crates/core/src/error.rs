//! Domain error model.

use thiserror::Error;

use crate::id::UnitId;
use crate::time::Timestamp;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Why an import batch was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValidationReason {
    /// The same id appears more than once in one batch.
    DuplicateId,
    /// Offer without a price, negative price, or a category carrying a price.
    InvalidPrice,
    /// An update tries to turn an offer into a category or vice versa.
    KindMismatch,
    /// The resulting parent graph would contain a cycle.
    CyclicParent,
    /// The parent does not exist or is not a category.
    InvalidParent,
    /// A unit name is empty.
    EmptyName,
    /// The record (or snapshot entry) is structurally unusable.
    MalformedRecord,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationReason::DuplicateId => "duplicate_id",
            ValidationReason::InvalidPrice => "invalid_price",
            ValidationReason::KindMismatch => "kind_mismatch",
            ValidationReason::CyclicParent => "cyclic_parent",
            ValidationReason::InvalidParent => "invalid_parent",
            ValidationReason::EmptyName => "empty_name",
            ValidationReason::MalformedRecord => "malformed_record",
        }
    }
}

impl core::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. A failed
/// operation never leaves partial state behind, so callers can retry or
/// report without any cleanup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An import batch (or restored snapshot) failed validation as a whole.
    #[error("validation failed ({reason}): {message}")]
    Validation {
        reason: ValidationReason,
        message: String,
    },

    /// The referenced unit does not exist.
    #[error("unit not found: {0}")]
    NotFound(UnitId),

    /// A statistics window whose start lies after its end.
    #[error("invalid range: {from} > {to}")]
    InvalidRange { from: Timestamp, to: Timestamp },

    /// An identifier was malformed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A timestamp could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl DomainError {
    pub fn validation(reason: ValidationReason, msg: impl Into<String>) -> Self {
        Self::Validation {
            reason,
            message: msg.into(),
        }
    }

    pub fn not_found(id: &UnitId) -> Self {
        Self::NotFound(id.clone())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_timestamp(msg: impl Into<String>) -> Self {
        Self::InvalidTimestamp(msg.into())
    }

    /// The validation reason, if this is a validation failure.
    pub fn reason(&self) -> Option<ValidationReason> {
        match self {
            DomainError::Validation { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// True for every error that stems from caller input rather than a missing unit.
    pub fn is_bad_input(&self) -> bool {
        !matches!(self, DomainError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_exposes_reason() {
        let err = DomainError::validation(ValidationReason::CyclicParent, "a -> b -> a");
        assert_eq!(err.reason(), Some(ValidationReason::CyclicParent));
        assert!(err.is_bad_input());
        assert_eq!(err.to_string(), "validation failed (cyclic_parent): a -> b -> a");
    }

    #[test]
    fn not_found_is_not_bad_input() {
        let err = DomainError::not_found(&UnitId::new("x"));
        assert_eq!(err.reason(), None);
        assert!(!err.is_bad_input());
    }
}
