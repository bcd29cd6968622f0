// crates/coursebook-store-sqlite/src/lib.rs
// ============================================================================
// Module: Coursebook SQLite Store
// Description: Durable relational store for Coursebook entities.
// Purpose: Persist users, courses, enrollments, assignments, and submission
//          metadata behind a single store type.
// Dependencies: coursebook-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This crate implements the relational half of Coursebook persistence on
//! `SQLite` with WAL journaling. Submission payload bytes live in the object
//! store; only their metadata rows are kept here. All list operations are
//! offset-paginated through the core pagination engine and never materialize
//! a full collection.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
