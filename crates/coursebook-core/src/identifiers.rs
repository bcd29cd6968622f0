// crates/coursebook-core/src/identifiers.rs
// ============================================================================
// Module: Coursebook Identifiers
// Description: Strongly typed identifiers for Coursebook entities.
// Purpose: Prevent id-kind mixups between users, courses, assignments, and
//          submissions while keeping stable numeric wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the typed identifiers used throughout Coursebook.
//! Entity identifiers are database row ids and serialize as plain integers;
//! [`BlobKey`] is the generated object-store name correlating a submission's
//! metadata row with its stored payload and serializes as a string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Entity Identifiers
// ============================================================================

/// Declares an integer-backed entity identifier newtype.
macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw row id.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row id.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

entity_id! {
    /// User identifier (admin, instructor, or student).
    UserId
}

entity_id! {
    /// Course identifier.
    CourseId
}

entity_id! {
    /// Assignment identifier, scoped to a course.
    AssignmentId
}

entity_id! {
    /// Submission identifier, scoped to an assignment.
    SubmissionId
}

// ============================================================================
// SECTION: Blob Key
// ============================================================================

/// Generated object-store key for an uploaded submission payload.
///
/// # Invariants
/// - Keys are server-generated and never derived from client filenames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobKey(String);

impl BlobKey {
    /// Creates a blob key from its string form.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BlobKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for BlobKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
