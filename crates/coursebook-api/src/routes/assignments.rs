// crates/coursebook-api/src/routes/assignments.rs
// ============================================================================
// Module: Assignment Routes
// Description: Assignment management and submission upload/download handlers.
// Purpose: Let course staff manage assignments and students hand in work,
//          streaming payloads through the two-store coordinator.
// Dependencies: axum, coursebook-core, serde
// ============================================================================

//! ## Overview
//! Assignment reads are public; writes authorize against the owning course.
//! Submission uploads arrive as multipart forms and flow through the
//! coordinator so the blob write and the metadata insert stay consistent.
//! Submission responses never expose the blob key; clients follow the
//! `submission_file` link instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::body::Body;
use axum::extract::Multipart;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use coursebook_core::ApiError;
use coursebook_core::Assignment;
use coursebook_core::AssignmentId;
use coursebook_core::AssignmentPatch;
use coursebook_core::NewAssignment;
use coursebook_core::OwnershipFacts;
use coursebook_core::PageRequest;
use coursebook_core::ResourceAction;
use coursebook_core::Role;
use coursebook_core::Submission;
use coursebook_core::SubmissionFilter;
use coursebook_core::SubmissionId;
use coursebook_core::UserId;
use serde::Deserialize;
use serde::Serialize;

use crate::links::PageLinks;
use crate::links::SelfLink;
use crate::links::SubmissionLinks;
use crate::links::page_links;
use crate::object_store::PayloadSpool;
use crate::routes::ApiFailure;
use crate::routes::ApiState;
use crate::routes::authenticate;
use crate::routes::check_access;
use crate::routes::courses::owning_facts;
use crate::routes::found_or_404;
use crate::routes::requested_page;

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Creation response body.
#[derive(Debug, Serialize)]
pub struct AssignmentCreated {
    /// New assignment id.
    pub id: AssignmentId,
    /// Link to the created resource.
    pub links: SelfLink,
}

/// Query parameters for submission listings.
#[derive(Debug, Default, Deserialize)]
pub struct SubmissionListQuery {
    /// Requested 1-based page; out-of-range values clamp.
    pub page: Option<i64>,
    /// Restrict to one student's submissions.
    pub student_id: Option<i64>,
}

/// Submission metadata as exposed over the API. The blob key stays
/// internal; the file link is the only handle to the payload.
#[derive(Debug, Serialize)]
pub struct SubmissionView {
    /// Submission id.
    pub id: SubmissionId,
    /// Owning assignment.
    pub assignment_id: AssignmentId,
    /// Submitting student.
    pub student_id: UserId,
    /// Server-assigned creation time (unix milliseconds).
    pub timestamp: i64,
    /// Original filename.
    pub filename: String,
    /// Stored payload content type.
    pub content_type: String,
    /// Links to the metadata resource and the stored file.
    pub links: SubmissionLinks,
}

impl From<Submission> for SubmissionView {
    fn from(submission: Submission) -> Self {
        let links = SubmissionLinks::new(
            submission.assignment_id.get(),
            submission.id.get(),
            &submission.filename,
        );
        Self {
            id: submission.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            timestamp: submission.timestamp,
            filename: submission.filename,
            content_type: submission.content_type,
            links,
        }
    }
}

/// One page of submissions under an assignment.
#[derive(Debug, Serialize)]
pub struct SubmissionPage {
    /// Submissions on this page.
    pub submissions: Vec<SubmissionView>,
    /// Effective page number.
    pub page: u64,
    /// Total pages under the active filter.
    pub total_pages: u64,
    /// Total submissions under the active filter.
    pub total_count: u64,
    /// Page navigation links.
    pub links: PageLinks,
}

/// Upload creation response body.
#[derive(Debug, Serialize)]
pub struct SubmissionCreated {
    /// New submission id.
    pub id: SubmissionId,
    /// Links to the metadata resource and the stored file.
    pub links: SubmissionLinks,
}

// ============================================================================
// SECTION: Assignment Handlers
// ============================================================================

/// `POST /assignments`: creates an assignment under a course.
pub async fn create_assignment(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<NewAssignment>,
) -> Result<impl IntoResponse, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::AssignmentCreate.as_str())?;
    if body.title.trim().is_empty() {
        return Err(ApiError::validation("title must be set").into());
    }
    if body.points < 0 {
        return Err(ApiError::validation("points must be non-negative").into());
    }
    if body.due.trim().is_empty() {
        return Err(ApiError::validation("due must be set").into());
    }
    let course = found_or_404(
        state.store.get_course(body.course_id)?,
        &format!("course {}", body.course_id),
    )?;
    check_access(
        &state,
        principal,
        ResourceAction::AssignmentCreate,
        owning_facts(principal, &course),
        "/assignments",
    )?;
    let assignment = state.store.insert_assignment(&body)?;
    let response = AssignmentCreated {
        id: assignment.id,
        links: SelfLink::new(format!("/assignments/{}", assignment.id)),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /assignments/{id}`: public assignment detail.
pub async fn get_assignment(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<Assignment>, ApiFailure> {
    let id = AssignmentId::new(id);
    let assignment =
        found_or_404(state.store.get_assignment(id)?, &format!("assignment {id}"))?;
    Ok(Json(assignment))
}

/// `PATCH /assignments/{id}`: partial update by admin or the owning
/// instructor. The owning course cannot be changed.
pub async fn update_assignment(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(patch): Json<AssignmentPatch>,
) -> Result<Json<Assignment>, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::AssignmentUpdate.as_str())?;
    if patch.is_empty() {
        return Err(ApiError::validation("patch must set at least one field").into());
    }
    let id = AssignmentId::new(id);
    let assignment =
        found_or_404(state.store.get_assignment(id)?, &format!("assignment {id}"))?;
    let course = found_or_404(
        state.store.get_course(assignment.course_id)?,
        &format!("course {}", assignment.course_id),
    )?;
    check_access(
        &state,
        principal,
        ResourceAction::AssignmentUpdate,
        owning_facts(principal, &course),
        &format!("/assignments/{id}"),
    )?;
    let updated =
        found_or_404(state.store.update_assignment(id, &patch)?, &format!("assignment {id}"))?;
    Ok(Json(updated))
}

/// `DELETE /assignments/{id}`: removes an assignment and its submissions
/// from both stores. The owning course is untouched.
pub async fn delete_assignment(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::AssignmentDelete.as_str())?;
    let id = AssignmentId::new(id);
    let assignment =
        found_or_404(state.store.get_assignment(id)?, &format!("assignment {id}"))?;
    let course = found_or_404(
        state.store.get_course(assignment.course_id)?,
        &format!("course {}", assignment.course_id),
    )?;
    check_access(
        &state,
        principal,
        ResourceAction::AssignmentDelete,
        owning_facts(principal, &course),
        &format!("/assignments/{id}"),
    )?;
    let blob_keys = state.store.blob_keys_for_assignment(id)?;
    state.store.delete_assignment(id)?;
    state.coordinator.purge_blobs(&blob_keys).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// SECTION: Submission Handlers
// ============================================================================

/// `GET /assignments/{id}/submissions`: paginated submission list for
/// course staff, optionally filtered to one student.
pub async fn list_submissions(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<SubmissionPage>, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::SubmissionList.as_str())?;
    let id = AssignmentId::new(id);
    let assignment =
        found_or_404(state.store.get_assignment(id)?, &format!("assignment {id}"))?;
    let course = found_or_404(
        state.store.get_course(assignment.course_id)?,
        &format!("course {}", assignment.course_id),
    )?;
    check_access(
        &state,
        principal,
        ResourceAction::SubmissionList,
        owning_facts(principal, &course),
        &format!("/assignments/{id}/submissions"),
    )?;
    let filter = SubmissionFilter {
        student_id: query.student_id.map(UserId::new),
    };
    let request = PageRequest {
        page: requested_page(query.page),
        page_size: state.pagination.submission_page_size,
    };
    let page = state.store.list_submissions(id, filter, request)?;
    let mut filters: Vec<(&str, String)> = Vec::new();
    if let Some(student_id) = query.student_id {
        filters.push(("student_id", student_id.to_string()));
    }
    let links = page_links(
        &format!("/assignments/{id}/submissions"),
        page.page,
        page.total_pages,
        &filters,
    );
    Ok(Json(SubmissionPage {
        submissions: page.items.into_iter().map(SubmissionView::from).collect(),
        page: page.page,
        total_pages: page.total_pages,
        total_count: page.total_count,
        links,
    }))
}

/// `POST /assignments/{id}/submissions`: multipart upload of one file.
///
/// Students submit for themselves; an optional `student_id` form field must
/// match the caller. Admins submit on a student's behalf and must supply
/// `student_id`.
pub async fn create_submission(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::SubmissionCreate.as_str())?;
    let id = AssignmentId::new(id);
    let assignment =
        found_or_404(state.store.get_assignment(id)?, &format!("assignment {id}"))?;
    let course = found_or_404(
        state.store.get_course(assignment.course_id)?,
        &format!("course {}", assignment.course_id),
    )?;

    let mut file: Option<(String, String, PayloadSpool)> = None;
    let mut requested_student: Option<UserId> = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::validation(err.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| ApiError::validation("file part must carry a filename"))?;
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                // Spool the body chunk by chunk; the payload never sits
                // whole in memory.
                let mut spool = PayloadSpool::new().await?;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|err| ApiError::validation(err.to_string()))?
                {
                    spool.write_chunk(&chunk).await?;
                }
                spool.finish().await?;
                file = Some((filename, content_type, spool));
            }
            Some("student_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::validation(err.to_string()))?;
                let parsed = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::validation("student_id must be an integer"))?;
                requested_student = Some(UserId::new(parsed));
            }
            _ => {}
        }
    }
    let (filename, content_type, payload) =
        file.ok_or_else(|| ApiError::validation("multipart body must carry a file part"))?;

    let student_id = match principal.role {
        Role::Student => {
            if requested_student.is_some_and(|requested| requested != principal.id) {
                return Err(
                    ApiError::validation("student_id must match the authenticated student").into()
                );
            }
            principal.id
        }
        _ => {
            let target = requested_student
                .ok_or_else(|| ApiError::validation("student_id must be set for staff uploads"))?;
            // Submissions may only be attributed to students enrolled in
            // the owning course, whoever uploads them.
            let is_student = state
                .store
                .get_user(target)?
                .is_some_and(|user| user.role == Role::Student);
            if !is_student || !state.store.is_enrolled(course.id, target)? {
                return Err(ApiError::validation(
                    "student_id must name a student enrolled in the course",
                )
                .into());
            }
            target
        }
    };
    let facts = OwnershipFacts {
        is_enrolled_student: principal.role == Role::Student
            && state.store.is_enrolled(course.id, principal.id)?,
        ..OwnershipFacts::none()
    };
    check_access(
        &state,
        principal,
        ResourceAction::SubmissionCreate,
        facts,
        &format!("/assignments/{id}/submissions"),
    )?;

    let submission = state
        .coordinator
        .create(id, student_id, filename, content_type, &payload)
        .await?;
    let response = SubmissionCreated {
        links: SubmissionLinks::new(id.get(), submission.id.get(), &submission.filename),
        id: submission.id,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /assignments/{assignment_id}/submissions/{submission_id}`:
/// submission metadata for staff and the owning student.
pub async fn get_submission(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((assignment_id, submission_id)): Path<(i64, i64)>,
) -> Result<Json<SubmissionView>, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::SubmissionRead.as_str())?;
    let (submission, course) =
        resolve_submission(&state, assignment_id, submission_id)?;
    let facts = submission_facts(&state, principal, &submission, &course)?;
    check_access(
        &state,
        principal,
        ResourceAction::SubmissionRead,
        facts,
        &format!("/assignments/{assignment_id}/submissions/{submission_id}"),
    )?;
    Ok(Json(SubmissionView::from(submission)))
}

/// `GET /assignments/{assignment_id}/submissions/{submission_id}/file/{filename}`:
/// streams the stored payload with its stored content type.
pub async fn download_submission_file(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((assignment_id, submission_id, filename)): Path<(i64, i64, String)>,
) -> Result<Response, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::SubmissionRead.as_str())?;
    let (submission, course) =
        resolve_submission(&state, assignment_id, submission_id)?;
    if submission.filename != filename {
        return Err(ApiError::not_found(format!("file {filename}")).into());
    }
    let facts = submission_facts(&state, principal, &submission, &course)?;
    check_access(
        &state,
        principal,
        ResourceAction::SubmissionRead,
        facts,
        &format!("/assignments/{assignment_id}/submissions/{submission_id}/file/{filename}"),
    )?;
    let download = state.coordinator.open_file(&submission.blob_key).await?;
    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, download.content_type.clone())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", submission.filename.replace('"', "")),
        );
    if let Some(length) = download.content_length {
        response = response.header(header::CONTENT_LENGTH, length);
    }
    response
        .body(Body::from_stream(download.stream))
        .map_err(|err| ApiError::storage(err.to_string()).into())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves a submission and its owning course, checking the nesting.
///
/// A submission reached through the wrong assignment path is treated as
/// missing, not as a different resource.
fn resolve_submission(
    state: &ApiState,
    assignment_id: i64,
    submission_id: i64,
) -> Result<(Submission, coursebook_core::Course), ApiFailure> {
    let assignment_id = AssignmentId::new(assignment_id);
    let submission_id = SubmissionId::new(submission_id);
    let assignment = found_or_404(
        state.store.get_assignment(assignment_id)?,
        &format!("assignment {assignment_id}"),
    )?;
    let submission = found_or_404(
        state.store.get_submission(submission_id)?,
        &format!("submission {submission_id}"),
    )?;
    if submission.assignment_id != assignment.id {
        return Err(ApiError::not_found(format!("submission {submission_id}")).into());
    }
    let course = found_or_404(
        state.store.get_course(assignment.course_id)?,
        &format!("course {}", assignment.course_id),
    )?;
    Ok((submission, course))
}

/// Ownership facts for reading one submission.
fn submission_facts(
    state: &ApiState,
    principal: coursebook_core::Principal,
    submission: &Submission,
    course: &coursebook_core::Course,
) -> Result<OwnershipFacts, ApiFailure> {
    Ok(OwnershipFacts {
        is_owning_instructor: principal.id == course.instructor_id,
        is_submission_owner: principal.id == submission.student_id,
        is_enrolled_student: principal.role == Role::Student
            && state.store.is_enrolled(course.id, principal.id)?,
        ..OwnershipFacts::none()
    })
}
