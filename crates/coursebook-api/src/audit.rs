// crates/coursebook-api/src/audit.rs
// ============================================================================
// Module: API Audit Logging
// Description: Structured audit events for authorization and storage outcomes.
// Purpose: Record allow/deny decisions and storage partial failures as JSON
//          lines without embedding credential material.
// Dependencies: coursebook-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are serialized as single JSON lines to stderr through the
//! [`AuditSink`] seam. Three event families exist: authorization decisions,
//! authentication failures, and orphaned-blob reports from the submission
//! coordinator. The orphaned-blob event is deliberately distinct so operators
//! can find the inconsistency window between the two stores.

// ============================================================================
// SECTION: Imports
// ============================================================================

use coursebook_core::Principal;
use coursebook_core::ResourceAction;
use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Audit event payload.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Event family identifier.
    event: &'static str,
    /// Decision outcome for authorization events.
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<&'static str>,
    /// Action label.
    action: String,
    /// Principal user id, when authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    principal_id: Option<i64>,
    /// Principal role label, when authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    principal_role: Option<&'static str>,
    /// Resource path or key the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    /// Failure reason for deny and error events.
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl AuditEvent {
    /// Builds an authorization allow event.
    #[must_use]
    pub fn allowed(principal: Principal, action: ResourceAction, resource: &str) -> Self {
        Self {
            event: "authz",
            decision: Some("allow"),
            action: action.as_str().to_string(),
            principal_id: Some(principal.id.get()),
            principal_role: Some(principal.role.as_str()),
            resource: Some(resource.to_string()),
            reason: None,
        }
    }

    /// Builds an authorization deny event.
    #[must_use]
    pub fn denied(
        principal: Principal,
        action: ResourceAction,
        resource: &str,
        reason: &str,
    ) -> Self {
        Self {
            event: "authz",
            decision: Some("deny"),
            action: action.as_str().to_string(),
            principal_id: Some(principal.id.get()),
            principal_role: Some(principal.role.as_str()),
            resource: Some(resource.to_string()),
            reason: Some(reason.to_string()),
        }
    }

    /// Builds an authentication failure event.
    #[must_use]
    pub fn auth_failure(action: &str, reason: &str) -> Self {
        Self {
            event: "authn",
            decision: Some("deny"),
            action: action.to_string(),
            principal_id: None,
            principal_role: None,
            resource: None,
            reason: Some(reason.to_string()),
        }
    }

    /// Builds an orphaned-blob event for a payload the coordinator could not
    /// clean up.
    #[must_use]
    pub fn orphaned_blob(key: &str, reason: &str) -> Self {
        Self {
            event: "orphaned_blob",
            decision: None,
            action: "blob_delete".to_string(),
            principal_id: None,
            principal_role: None,
            resource: Some(key.to_string()),
            reason: Some(reason.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for API events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    #[allow(clippy::print_stderr, reason = "stderr is this sink's transport")]
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}
