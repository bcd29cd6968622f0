// crates/coursebook-api/src/routes/users.rs
// ============================================================================
// Module: User Routes
// Description: Account creation, login, and user detail handlers.
// Purpose: Manage accounts and issue auth tokens while keeping password
//          material out of every response.
// Dependencies: axum, coursebook-core, serde
// ============================================================================

//! ## Overview
//! Account creation is open for student accounts and admin-gated for
//! privileged roles. Login failures are deliberately uniform: a wrong
//! password and an unknown email produce the same 401 so the endpoint does
//! not confirm which emails exist. User detail responses attach the course
//! ids relevant to the role.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use coursebook_core::ApiError;
use coursebook_core::CourseId;
use coursebook_core::NewUser;
use coursebook_core::OwnershipFacts;
use coursebook_core::ResourceAction;
use coursebook_core::Role;
use coursebook_core::UserId;
use serde::Deserialize;
use serde::Serialize;

use crate::links::SelfLink;
use crate::routes::ApiFailure;
use crate::routes::ApiState;
use crate::routes::authenticate;
use crate::routes::check_access;
use crate::routes::found_or_404;

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Signed bearer token.
    pub token: String,
}

/// Creation response body.
#[derive(Debug, Serialize)]
pub struct UserCreated {
    /// New user id.
    pub id: UserId,
    /// Link to the created resource.
    pub links: SelfLink,
}

/// User detail response.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    /// User id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Account role.
    pub role: Role,
    /// Courses taught (instructors) or enrolled in (students).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<CourseId>>,
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `POST /users`: creates an account.
///
/// Student accounts are open to anyone; admin and instructor accounts
/// require an authenticated admin caller.
pub async fn create_user(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiFailure> {
    if body.name.trim().is_empty() {
        return Err(ApiError::validation("name must be set").into());
    }
    if body.email.trim().is_empty() || !body.email.contains('@') {
        return Err(ApiError::validation("email must be a valid address").into());
    }
    if body.password.is_empty() {
        return Err(ApiError::validation("password must be set").into());
    }
    if body.role != Role::Student {
        let principal = authenticate(&state, &headers, "user/create")?;
        if principal.role != Role::Admin {
            return Err(ApiError::authorization(
                "only admins may create privileged accounts",
            )
            .into());
        }
    }
    let password_hash = state.hasher.hash(&body.password);
    let user =
        state.store.insert_user(body.name.trim(), body.email.trim(), &password_hash, body.role)?;
    let response = UserCreated {
        id: user.id,
        links: SelfLink::new(format!("/users/{}", user.id)),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /users/login`: verifies credentials and mints a bearer token.
///
/// Unknown emails and wrong passwords share one failure message.
pub async fn login(
    State(state): State<ApiState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiFailure> {
    let user = state
        .store
        .find_user_by_email(body.email.trim())?
        .filter(|user| state.hasher.verify(&body.password, &user.password_hash))
        .ok_or_else(|| ApiError::authentication("invalid credentials"))?;
    let token = state.signer.mint(&user)?;
    Ok(Json(LoginResponse { token }))
}

/// `GET /users/{id}`: returns a user's detail record.
///
/// Visible to the user themselves and to admins. Instructor responses list
/// the ids of courses they teach; student responses list enrolled course
/// ids.
pub async fn get_user(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<UserDetail>, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::UserRead.as_str())?;
    let id = UserId::new(id);
    let user = found_or_404(state.store.get_user(id)?, &format!("user {id}"))?;
    let facts = OwnershipFacts {
        is_self: principal.id == user.id,
        ..OwnershipFacts::none()
    };
    check_access(&state, principal, ResourceAction::UserRead, facts, &format!("/users/{id}"))?;
    let courses = match user.role {
        Role::Instructor => Some(state.store.courses_taught_by(user.id)?),
        Role::Student => Some(state.store.courses_enrolled_in(user.id)?),
        Role::Admin => None,
    };
    Ok(Json(UserDetail {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        courses,
    }))
}
