// crates/coursebook-api/src/lib.rs
// ============================================================================
// Module: Coursebook API
// Description: HTTP surface for the Coursebook course-management service.
// Purpose: Compose authentication, access control, stores, and the submission
//          coordinator behind axum resource routers.
// Dependencies: axum, tokio, coursebook-core, coursebook-store-sqlite,
//               coursebook-config, aws-sdk-s3
// ============================================================================

//! ## Overview
//! The API crate wires the pure domain layer to the outside world: bearer
//! token authentication, per-request authorization through the core access
//! control evaluator, resource routers for users, courses, assignments, and
//! submissions, and the two-store submission coordinator. Uploads spool to
//! scratch files and downloads stream through a bounded channel; nothing
//! buffers a whole file in memory.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod links;
pub mod object_store;
pub mod routes;
pub mod server;
pub mod submissions;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::PasswordHasher;
pub use auth::TokenSigner;
pub use object_store::BlobStore;
pub use object_store::InMemoryBlobStore;
pub use object_store::S3BlobStore;
pub use routes::ApiState;
pub use server::ApiServer;
pub use submissions::SubmissionCoordinator;
