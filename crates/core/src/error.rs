//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Storage and
/// transport concerns belong elsewhere. Every message is safe to show to an
/// admin user verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Amount missing, non-numeric, non-finite, or not strictly positive.
    #[error("{0}")]
    InvalidAmount(String),

    /// Unknown ledger action, or an action that does not apply to its target.
    #[error("{0}")]
    InvalidOperation(String),

    /// Expense category outside the closed set.
    #[error("{0}")]
    InvalidCategory(String),

    /// Transfer status string outside the enumerated set.
    #[error("{0}")]
    InvalidStatus(String),

    /// Status change not allowed by the transfer transition table.
    #[error("{0}")]
    InvalidTransition(String),

    /// A value failed validation (malformed input not covered above).
    #[error("{0}")]
    Validation(String),

    /// A requested resource was not found.
    #[error("{0}")]
    NotFound(String),

    /// The request carried nothing to change.
    #[error("no fields supplied")]
    NoOp,

    /// A conflict occurred (e.g. stale version / compare-and-set failure).
    #[error("{0}")]
    Conflict(String),

    /// Caller is not authenticated as an admin.
    #[error("unauthorized")]
    Unauthorized,

    /// Caller is authenticated but the operation is not allowed here.
    #[error("{0}")]
    Forbidden(String),
}

impl DomainError {
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn invalid_category(msg: impl Into<String>) -> Self {
        Self::InvalidCategory(msg.into())
    }

    pub fn invalid_status(msg: impl Into<String>) -> Self {
        Self::InvalidStatus(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Stable snake_case tag for the error kind (used in API payloads and logs).
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidAmount(_) => "invalid_amount",
            DomainError::InvalidOperation(_) => "invalid_operation",
            DomainError::InvalidCategory(_) => "invalid_category",
            DomainError::InvalidStatus(_) => "invalid_status",
            DomainError::InvalidTransition(_) => "invalid_transition",
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::NoOp => "no_op",
            DomainError::Conflict(_) => "conflict",
            DomainError::Unauthorized => "unauthorized",
            DomainError::Forbidden(_) => "forbidden",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_passed_through_verbatim() {
        let err = DomainError::invalid_transition(
            "Cannot transition from PLANNED to CONFIRMED. Allowed: SUBMITTED, CANCELED",
        );
        assert_eq!(
            err.to_string(),
            "Cannot transition from PLANNED to CONFIRMED. Allowed: SUBMITTED, CANCELED"
        );
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn no_op_has_fixed_message() {
        assert_eq!(DomainError::NoOp.to_string(), "no fields supplied");
    }
}
