// crates/coursebook-config/src/lib.rs
// ============================================================================
// Module: Coursebook Configuration
// Description: Configuration loading and validation for the Coursebook API.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: coursebook-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: the server refuses to start
//! rather than run with weak credentials or an unbound store.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuthConfig;
pub use config::BlobStorageConfig;
pub use config::ConfigError;
pub use config::CoursebookConfig;
pub use config::PaginationConfig;
pub use config::S3ObjectStoreConfig;
pub use config::ServerConfig;
