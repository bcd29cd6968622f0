// crates/coursebook-config/tests/config_validation.rs
// ============================================================================
// Module: Configuration Validation Tests
// Description: Fail-closed validation tests for Coursebook configuration.
// Purpose: Validate bind parsing, secret strength, page size limits, and
//          object-store endpoint rules.
// ============================================================================

//! ## Overview
//! Validation tests for the configuration surface:
//! - Minimal valid config parses with defaults applied
//! - Weak token secrets and zero page sizes are rejected
//! - Plain-HTTP object-store endpoints require explicit opt-in

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use coursebook_config::BlobStorageConfig;
use coursebook_config::ConfigError;
use coursebook_config::CoursebookConfig;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn minimal_config() -> String {
    format!(
        r#"
[auth]
token_secret = "{SECRET}"

[database]
path = "coursebook.db"

[object_store]
type = "memory"
"#
    )
}

fn parse(content: &str) -> Result<CoursebookConfig, ConfigError> {
    let config: CoursebookConfig = toml::from_str(content).expect("toml parse");
    config.validate().map(|()| config)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn minimal_config_applies_defaults() {
    let config = parse(&minimal_config()).expect("valid config");
    assert_eq!(config.server.bind, "127.0.0.1:8000");
    assert_eq!(config.pagination.course_page_size, 10);
    assert_eq!(config.pagination.submission_page_size, 3);
    assert_eq!(config.auth.token_ttl_seconds, 24 * 60 * 60);
    assert!(matches!(config.object_store, BlobStorageConfig::Memory));
}

#[test]
fn short_token_secret_is_rejected() {
    let content = minimal_config().replace(SECRET, "too-short");
    let err = parse(&content).expect_err("weak secret must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn invalid_bind_address_is_rejected() {
    let content = format!("[server]\nbind = \"not-an-address\"\n{}", minimal_config());
    let err = parse(&content).expect_err("bad bind must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn zero_page_size_is_rejected() {
    let content = format!("{}\n[pagination]\ncourse_page_size = 0\n", minimal_config());
    let err = parse(&content).expect_err("zero page size must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn oversized_page_size_is_rejected() {
    let content = format!("{}\n[pagination]\nsubmission_page_size = 1000\n", minimal_config());
    let err = parse(&content).expect_err("oversized page size must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn s3_http_endpoint_requires_opt_in() {
    let base = format!(
        r#"
[auth]
token_secret = "{SECRET}"

[database]
path = "coursebook.db"

[object_store]
type = "s3"
bucket = "coursebook-submissions"
endpoint = "http://localhost:9000"
"#
    );
    let err = parse(&base).expect_err("plain http without opt-in must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));
    let allowed = format!("{base}allow_http = true\n");
    parse(&allowed).expect("opt-in http endpoint is accepted");
}

#[test]
fn s3_bucket_must_be_set() {
    let content = format!(
        r#"
[auth]
token_secret = "{SECRET}"

[database]
path = "coursebook.db"

[object_store]
type = "s3"
bucket = "  "
"#
    );
    let err = parse(&content).expect_err("blank bucket must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn load_reads_and_validates_from_disk() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let path = dir.path().join("coursebook.toml");
    std::fs::write(&path, minimal_config()).expect("write config");
    let config = CoursebookConfig::load(Some(&path)).expect("load config");
    assert_eq!(config.database.path, std::path::PathBuf::from("coursebook.db"));
}

#[test]
fn load_rejects_missing_file() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let err = CoursebookConfig::load(Some(&dir.path().join("absent.toml")))
        .expect_err("missing file must fail");
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn missing_database_path_is_rejected() {
    let content = minimal_config().replace("path = \"coursebook.db\"", "path = \"\"");
    let err = parse(&content).expect_err("empty database path must fail");
    assert!(matches!(err, ConfigError::Invalid(_)));
}
