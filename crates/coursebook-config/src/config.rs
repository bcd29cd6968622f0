// crates/coursebook-config/src/config.rs
// ============================================================================
// Module: Coursebook Configuration
// Description: Configuration loading and validation for the Coursebook API.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: coursebook-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section validates before the server starts: bind addresses must
//! parse, the token secret must clear a minimum length, page sizes must be
//! positive, and object-store endpoints must be TLS unless plain HTTP is
//! explicitly opted into.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use coursebook_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "coursebook.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "COURSEBOOK_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum length of the token signing secret.
pub(crate) const MIN_TOKEN_SECRET_LENGTH: usize = 32;
/// Maximum token lifetime in seconds (7 days).
pub(crate) const MAX_TOKEN_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;
/// Maximum accepted page size for any collection.
pub(crate) const MAX_PAGE_SIZE: u64 = 100;
/// Default page size for course listings.
const DEFAULT_COURSE_PAGE_SIZE: u64 = 10;
/// Default page size for submission listings.
const DEFAULT_SUBMISSION_PAGE_SIZE: u64 = 3;
/// Default bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8000";
/// Default maximum request body size in bytes (32 MiB).
const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;
/// Default token lifetime in seconds (24 hours).
const DEFAULT_TOKEN_TTL_SECONDS: u64 = 24 * 60 * 60;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file I/O error.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config validation error.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level Coursebook API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CoursebookConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Relational store configuration.
    pub database: SqliteStoreConfig,
    /// Object-store configuration for submission payloads.
    pub object_store: BlobStorageConfig,
    /// Pagination configuration.
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl CoursebookConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path argument wins over the `COURSEBOOK_CONFIG` environment
    /// variable, which wins over `coursebook.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        validate_database(&self.database)?;
        self.object_store.validate()?;
        self.pagination.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address, `host:port`.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Validates the server section.
    fn validate(&self) -> Result<(), ConfigError> {
        let bind = self.bind.trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("server.bind must be set".to_string()));
        }
        bind.parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid("server.bind is not a valid address".to_string()))?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the address does not parse; `validate`
    /// rejects such configs before the server starts.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid("server.bind is not a valid address".to_string()))
    }
}

/// Authentication configuration.
///
/// # Invariants
/// - `token_secret` never appears in logs or error messages.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to derive the token signing key.
    pub token_secret: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl AuthConfig {
    /// Validates the auth section.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.len() < MIN_TOKEN_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "auth.token_secret must be at least {MIN_TOKEN_SECRET_LENGTH} bytes"
            )));
        }
        if self.token_ttl_seconds == 0 || self.token_ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_seconds out of range: {} (max {MAX_TOKEN_TTL_SECONDS})",
                self.token_ttl_seconds
            )));
        }
        Ok(())
    }
}

/// Object-store configuration for submission payloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobStorageConfig {
    /// Amazon S3 compatible object storage.
    S3(S3ObjectStoreConfig),
    /// In-process memory store for tests and local development.
    Memory,
}

impl BlobStorageConfig {
    /// Validates object-store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::S3(config) => config.validate(),
            Self::Memory => Ok(()),
        }
    }
}

/// S3-compatible object-store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct S3ObjectStoreConfig {
    /// Bucket name for submission payloads.
    pub bucket: String,
    /// Optional region (defaults to environment).
    #[serde(default)]
    pub region: Option<String>,
    /// Optional object-store endpoint (S3-compatible).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Optional key prefix inside the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Force path-style addressing (S3-compatible).
    #[serde(default)]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
}

impl S3ObjectStoreConfig {
    /// Validates S3 object-store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when object-store settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("object_store.bucket must be set".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            let trimmed = endpoint.trim();
            if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                return Err(ConfigError::Invalid(
                    "object_store.endpoint must include http:// or https://".to_string(),
                ));
            }
            if trimmed.starts_with("http://") && !self.allow_http {
                return Err(ConfigError::Invalid(
                    "object_store.endpoint uses http:// without allow_http".to_string(),
                ));
            }
        }
        if let Some(prefix) = &self.prefix {
            validate_object_store_prefix(prefix)?;
        }
        Ok(())
    }
}

/// Pagination configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationConfig {
    /// Page size for course listings.
    #[serde(default = "default_course_page_size")]
    pub course_page_size: u64,
    /// Page size for submission listings.
    #[serde(default = "default_submission_page_size")]
    pub submission_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            course_page_size: default_course_page_size(),
            submission_page_size: default_submission_page_size(),
        }
    }
}

impl PaginationConfig {
    /// Validates the pagination section.
    fn validate(self) -> Result<(), ConfigError> {
        for (name, size) in [
            ("pagination.course_page_size", self.course_page_size),
            ("pagination.submission_page_size", self.submission_page_size),
        ] {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(ConfigError::Invalid(format!(
                    "{name} out of range: {size} (max {MAX_PAGE_SIZE})"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default token lifetime in seconds.
const fn default_token_ttl_seconds() -> u64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

/// Returns the default course page size.
const fn default_course_page_size() -> u64 {
    DEFAULT_COURSE_PAGE_SIZE
}

/// Returns the default submission page size.
const fn default_submission_page_size() -> u64 {
    DEFAULT_SUBMISSION_PAGE_SIZE
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates the database section beyond its own deserialization defaults.
fn validate_database(config: &SqliteStoreConfig) -> Result<(), ConfigError> {
    if config.path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("database.path must be set".to_string()));
    }
    validate_path(&config.path)?;
    Ok(())
}

/// Resolves the config path from argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(value) = env::var(CONFIG_ENV_VAR) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid(format!("{CONFIG_ENV_VAR} must not be empty")));
        }
        return Ok(PathBuf::from(trimmed));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates path length and component limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let raw = path.as_os_str();
    if raw.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("path exceeds max length".to_string()));
    }
    for component in path.components() {
        if let Component::Normal(part) = component
            && part.len() > MAX_PATH_COMPONENT_LENGTH
        {
            return Err(ConfigError::Invalid("path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates the object-store prefix string.
fn validate_object_store_prefix(value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid("object_store.prefix must be non-empty".to_string()));
    }
    if value.contains('\\') {
        return Err(ConfigError::Invalid(
            "object_store.prefix must not contain backslashes".to_string(),
        ));
    }
    if value.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("object_store.prefix exceeds max length".to_string()));
    }
    let path = Path::new(value);
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                if part.len() > MAX_PATH_COMPONENT_LENGTH {
                    return Err(ConfigError::Invalid(
                        "object_store.prefix segment too long".to_string(),
                    ));
                }
            }
            _ => {
                return Err(ConfigError::Invalid(
                    "object_store.prefix must be relative without traversal".to_string(),
                ));
            }
        }
    }
    Ok(())
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
    fn prefix_rejects_traversal_and_absolute_paths() {
        assert!(validate_object_store_prefix("submissions/prod").is_ok());
        assert!(validate_object_store_prefix("/submissions").is_err());
        assert!(validate_object_store_prefix("../submissions").is_err());
        assert!(validate_object_store_prefix("a\\b").is_err());
    }
}
