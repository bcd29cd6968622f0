// crates/coursebook-api/src/server.rs
// ============================================================================
// Module: API Server
// Description: Server assembly and lifecycle from loaded configuration.
// Purpose: Wire the stores, signer, coordinator, and router together and
//          serve them over TCP.
// Dependencies: axum, tokio, coursebook-config, coursebook-store-sqlite
// ============================================================================

//! ## Overview
//! [`ApiServer::from_config`] builds every component from a validated
//! [`CoursebookConfig`]: the SQLite store, the configured blob store backend,
//! the token signer, and the submission coordinator, then assembles the
//! router with the configured body limit. [`ApiServer::serve`] binds and
//! runs until the process is stopped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use coursebook_config::BlobStorageConfig;
use coursebook_config::CoursebookConfig;
use coursebook_store_sqlite::SqliteStore;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::AuditSink;
use crate::audit::StderrAuditSink;
use crate::auth::PasswordHasher;
use crate::auth::TokenSigner;
use crate::object_store::BlobStore;
use crate::object_store::InMemoryBlobStore;
use crate::object_store::S3BlobStore;
use crate::routes::ApiState;
use crate::routes::router;
use crate::submissions::SubmissionCoordinator;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while assembling or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Store initialization failure.
    #[error("store error: {0}")]
    Store(String),
    /// Network failure while binding or serving.
    #[error("io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Assembled API server ready to bind.
pub struct ApiServer {
    /// Bind address taken from configuration.
    bind: std::net::SocketAddr,
    /// Fully wired router.
    app: Router,
}

impl ApiServer {
    /// Builds the server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when a component cannot be constructed.
    pub async fn from_config(config: &CoursebookConfig) -> Result<Self, ServerError> {
        let bind = config
            .server
            .bind_addr()
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let store = SqliteStore::new(&config.database)
            .map_err(|err| ServerError::Store(err.to_string()))?;
        let blobs: Arc<dyn BlobStore> = match &config.object_store {
            BlobStorageConfig::S3(s3) => Arc::new(
                S3BlobStore::new(s3)
                    .await
                    .map_err(|err| ServerError::Config(err.to_string()))?,
            ),
            BlobStorageConfig::Memory => Arc::new(InMemoryBlobStore::new()),
        };
        let audit: Arc<dyn AuditSink> = Arc::new(StderrAuditSink);
        let signer = Arc::new(TokenSigner::from_secret(
            &config.auth.token_secret,
            config.auth.token_ttl_seconds,
        ));
        let coordinator = Arc::new(SubmissionCoordinator::new(
            store.clone(),
            Arc::clone(&blobs),
            Arc::clone(&audit),
        ));
        let state = ApiState {
            store,
            coordinator,
            signer,
            hasher: PasswordHasher,
            audit,
            pagination: config.pagination,
        };
        let app = router(state).layer(DefaultBodyLimit::max(config.server.max_body_bytes));
        Ok(Self { bind, app })
    }

    /// Binds the configured address and serves until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Io(err.to_string()))?;
        axum::serve(listener, self.app)
            .await
            .map_err(|err| ServerError::Io(err.to_string()))
    }
}
