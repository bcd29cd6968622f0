// crates/coursebook-core/src/lib.rs
// ============================================================================
// Module: Coursebook Core
// Description: Domain types and pure decision logic for the Coursebook API.
// Purpose: Provide identifiers, entities, access control, and pagination
//          without any I/O dependencies.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Coursebook core holds the pure domain layer shared by the store and HTTP
//! crates: typed identifiers, entity models, the access control evaluator,
//! the pagination engine, and the API error taxonomy. Nothing in this crate
//! performs I/O; stores and services compose these pieces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod authz;
pub mod entities;
pub mod error;
pub mod identifiers;
pub mod pagination;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use authz::AccessDecision;
pub use authz::OwnershipFacts;
pub use authz::Principal;
pub use authz::ResourceAction;
pub use authz::authorize;
pub use entities::Assignment;
pub use entities::AssignmentPatch;
pub use entities::Course;
pub use entities::CourseFilter;
pub use entities::CoursePatch;
pub use entities::EnrollmentResult;
pub use entities::EnrollmentUpdate;
pub use entities::NewAssignment;
pub use entities::NewCourse;
pub use entities::NewSubmission;
pub use entities::NewUser;
pub use entities::Role;
pub use entities::Submission;
pub use entities::SubmissionFilter;
pub use entities::User;
pub use error::ApiError;
pub use identifiers::AssignmentId;
pub use identifiers::BlobKey;
pub use identifiers::CourseId;
pub use identifiers::SubmissionId;
pub use identifiers::UserId;
pub use pagination::Page;
pub use pagination::PageBounds;
pub use pagination::PageRequest;
