// crates/coursebook-api/src/routes/mod.rs
// ============================================================================
// Module: API Routes
// Description: Router assembly, shared state, and request plumbing.
// Purpose: Compose the resource routers and centralize authentication,
//          authorization, and error-to-status mapping.
// Dependencies: axum, coursebook-core, coursebook-store-sqlite,
//               coursebook-config, serde_json
// ============================================================================

//! ## Overview
//! Each resource family lives in its own submodule; this module owns the
//! [`ApiState`] they share, the [`ApiFailure`] response mapping, and the
//! authentication/authorization helpers every protected handler funnels
//! through. Handlers resolve the target entity before authorizing, so a
//! missing resource is always 404 regardless of who asks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assignments;
pub mod courses;
pub mod users;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use coursebook_config::PaginationConfig;
use coursebook_core::AccessDecision;
use coursebook_core::ApiError;
use coursebook_core::OwnershipFacts;
use coursebook_core::Principal;
use coursebook_core::ResourceAction;
use coursebook_core::authorize;
use coursebook_store_sqlite::SqliteStore;
use serde_json::json;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::auth::PasswordHasher;
use crate::auth::TokenSigner;
use crate::auth::parse_bearer_token;
use crate::submissions::SubmissionCoordinator;

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Relational store.
    pub store: SqliteStore,
    /// Two-store submission coordinator.
    pub coordinator: Arc<SubmissionCoordinator>,
    /// Token signer and verifier.
    pub signer: Arc<TokenSigner>,
    /// Password hasher.
    pub hasher: PasswordHasher,
    /// Audit sink for authn/authz outcomes.
    pub audit: Arc<dyn AuditSink>,
    /// Configured page sizes.
    pub pagination: PaginationConfig,
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the full API router over the shared state.
#[must_use]
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/users", post(users::create_user))
        .route("/users/login", post(users::login))
        .route("/users/{id}", get(users::get_user))
        .route("/courses", get(courses::list_courses).post(courses::create_course))
        .route(
            "/courses/{id}",
            get(courses::get_course)
                .patch(courses::update_course)
                .delete(courses::delete_course),
        )
        .route(
            "/courses/{id}/students",
            get(courses::list_students).post(courses::update_enrollment),
        )
        .route("/courses/{id}/roster", get(courses::download_roster))
        .route("/courses/{id}/assignments", get(courses::list_assignments))
        .route("/assignments", post(assignments::create_assignment))
        .route(
            "/assignments/{id}",
            get(assignments::get_assignment)
                .patch(assignments::update_assignment)
                .delete(assignments::delete_assignment),
        )
        .route(
            "/assignments/{id}/submissions",
            get(assignments::list_submissions).post(assignments::create_submission),
        )
        .route(
            "/assignments/{assignment_id}/submissions/{submission_id}",
            get(assignments::get_submission),
        )
        .route(
            "/assignments/{assignment_id}/submissions/{submission_id}/file/{filename}",
            get(assignments::download_submission_file),
        )
        .with_state(state)
}

// ============================================================================
// SECTION: Failure Mapping
// ============================================================================

/// Response wrapper translating [`ApiError`] into an HTTP status and a JSON
/// error body.
#[derive(Debug)]
pub struct ApiFailure(
    /// Underlying error.
    pub ApiError,
);

impl<E> From<E> for ApiFailure
where
    E: Into<ApiError>,
{
    fn from(error: E) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ApiError::Validation(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            ApiError::Authentication(detail) => (StatusCode::UNAUTHORIZED, detail.clone()),
            ApiError::Authorization(detail) => (StatusCode::FORBIDDEN, detail.clone()),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail.clone()),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, detail.clone()),
            // Internal causes are logged upstream; clients get a generic line.
            ApiError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal storage error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ============================================================================
// SECTION: Request Helpers
// ============================================================================

/// Authenticates the bearer token on a request.
///
/// # Errors
///
/// Returns an authentication [`ApiFailure`] (401) when the token is missing,
/// malformed, expired, or fails verification; the failure is audited under
/// `action`.
pub fn authenticate(
    state: &ApiState,
    headers: &HeaderMap,
    action: &str,
) -> Result<Principal, ApiFailure> {
    let header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let result = parse_bearer_token(header).and_then(|token| state.signer.verify(&token));
    match result {
        Ok(principal) => Ok(principal),
        Err(err) => {
            state.audit.record(&AuditEvent::auth_failure(action, &err.to_string()));
            Err(err.into())
        }
    }
}

/// Authorizes `action` for `principal`, recording the decision.
///
/// # Errors
///
/// Returns an authorization [`ApiFailure`] (403) carrying the evaluator's
/// deny reason.
pub fn check_access(
    state: &ApiState,
    principal: Principal,
    action: ResourceAction,
    facts: OwnershipFacts,
    resource: &str,
) -> Result<(), ApiFailure> {
    match authorize(principal, action, facts) {
        AccessDecision::Allow => {
            state.audit.record(&AuditEvent::allowed(principal, action, resource));
            Ok(())
        }
        AccessDecision::Deny(reason) => {
            state.audit.record(&AuditEvent::denied(principal, action, resource, reason));
            Err(ApiError::authorization(reason).into())
        }
    }
}

/// Maps an optional lookup result to 404 naming the missing entity.
///
/// # Errors
///
/// Returns a not-found [`ApiFailure`] when the value is absent.
pub fn found_or_404<T>(value: Option<T>, what: &str) -> Result<T, ApiFailure> {
    value.ok_or_else(|| ApiFailure(ApiError::not_found(what.to_string())))
}

/// Normalizes a raw `page` query value to a usable 1-based page number.
///
/// Zero and negative values clamp to the first page, matching how
/// above-range pages clamp to the last; a stale or hand-edited link never
/// turns into a client error.
pub(crate) fn requested_page(raw: Option<i64>) -> u64 {
    raw.map_or(1, |page| u64::try_from(page).unwrap_or(1).max(1))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, reason = "Test-only panic-based assertions are permitted.")]

    use super::requested_page;

    #[test]
    fn page_values_clamp_below_range() {
        assert_eq!(requested_page(None), 1);
        assert_eq!(requested_page(Some(-1)), 1);
        assert_eq!(requested_page(Some(0)), 1);
        assert_eq!(requested_page(Some(7)), 7);
    }
}
