// crates/coursebook-core/src/error.rs
// ============================================================================
// Module: Coursebook Error Taxonomy
// Description: Shared error type mapping domain failures to API outcomes.
// Purpose: Give every layer one failure vocabulary so handlers map errors to
//          status codes in a single place.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ApiError`] is the single error type flowing from stores and services up
//! to the HTTP layer. Each variant corresponds to exactly one response class;
//! the mapping to status codes lives with the HTTP layer so this crate stays
//! transport-free.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Unified Coursebook failure taxonomy.
///
/// Variants carry operator-facing detail strings; internal causes in
/// [`ApiError::Storage`] are logged but never echoed to clients verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or parameters failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing, malformed, or unverifiable credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Authenticated principal lacks permission for the operation.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness or state conflict (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Relational or object store failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// Builds a validation error.
    #[must_use]
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    /// Builds an authentication error.
    #[must_use]
    pub fn authentication(detail: impl Into<String>) -> Self {
        Self::Authentication(detail.into())
    }

    /// Builds an authorization error.
    #[must_use]
    pub fn authorization(detail: impl Into<String>) -> Self {
        Self::Authorization(detail.into())
    }

    /// Builds a not-found error naming the missing entity.
    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }

    /// Builds a conflict error.
    #[must_use]
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict(detail.into())
    }

    /// Builds a storage error.
    #[must_use]
    pub fn storage(detail: impl Into<String>) -> Self {
        Self::Storage(detail.into())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::*;

    #[test]
    fn display_includes_class_and_detail() {
        let err = ApiError::not_found("course 42");
        assert_eq!(err.to_string(), "not found: course 42");
        let err = ApiError::conflict("email already registered");
        assert_eq!(err.to_string(), "conflict: email already registered");
    }
}
