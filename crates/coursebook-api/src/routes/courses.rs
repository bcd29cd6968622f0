// crates/coursebook-api/src/routes/courses.rs
// ============================================================================
// Module: Course Routes
// Description: Course catalog, roster, and enrollment handlers.
// Purpose: Serve the public catalog and let admins and owning instructors
//          manage courses and their rosters.
// Dependencies: axum, coursebook-core, serde
// ============================================================================

//! ## Overview
//! Catalog reads are public; every write resolves the course first and then
//! authorizes against ownership. Deleting a course removes its relational
//! subtree through cascades before the payload blobs are purged, so a
//! partial failure leaves orphaned blobs rather than dangling metadata.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use coursebook_core::ApiError;
use coursebook_core::Assignment;
use coursebook_core::Course;
use coursebook_core::CourseFilter;
use coursebook_core::CourseId;
use coursebook_core::CoursePatch;
use coursebook_core::EnrollmentResult;
use coursebook_core::EnrollmentUpdate;
use coursebook_core::NewCourse;
use coursebook_core::OwnershipFacts;
use coursebook_core::PageRequest;
use coursebook_core::Principal;
use coursebook_core::ResourceAction;
use coursebook_core::User;
use serde::Deserialize;
use serde::Serialize;

use crate::links::PageLinks;
use crate::links::SelfLink;
use crate::links::page_links;
use crate::routes::ApiFailure;
use crate::routes::ApiState;
use crate::routes::authenticate;
use crate::routes::check_access;
use crate::routes::found_or_404;
use crate::routes::requested_page;

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Query parameters for the course catalog.
#[derive(Debug, Default, Deserialize)]
pub struct CourseListQuery {
    /// Requested 1-based page; out-of-range values clamp.
    pub page: Option<i64>,
    /// Subject code filter.
    pub subject: Option<String>,
    /// Course number filter.
    pub number: Option<String>,
    /// Term filter.
    pub term: Option<String>,
}

/// One page of the course catalog.
#[derive(Debug, Serialize)]
pub struct CoursePage {
    /// Courses on this page.
    pub courses: Vec<Course>,
    /// Effective page number.
    pub page: u64,
    /// Total pages under the active filter.
    pub total_pages: u64,
    /// Total courses under the active filter.
    pub total_count: u64,
    /// Page navigation links.
    pub links: PageLinks,
}

/// Creation response body.
#[derive(Debug, Serialize)]
pub struct CourseCreated {
    /// New course id.
    pub id: CourseId,
    /// Link to the created resource.
    pub links: SelfLink,
}

/// Enrolled-student list response.
#[derive(Debug, Serialize)]
pub struct StudentList {
    /// Enrolled students in id order.
    pub students: Vec<User>,
}

/// Assignment list response.
#[derive(Debug, Serialize)]
pub struct AssignmentList {
    /// Assignments in id order.
    pub assignments: Vec<Assignment>,
}

// ============================================================================
// SECTION: Catalog Handlers
// ============================================================================

/// `GET /courses`: public paginated catalog with optional filters.
pub async fn list_courses(
    State(state): State<ApiState>,
    Query(query): Query<CourseListQuery>,
) -> Result<Json<CoursePage>, ApiFailure> {
    let filter = CourseFilter {
        subject: query.subject.clone(),
        number: query.number.clone(),
        term: query.term.clone(),
    };
    let request = PageRequest {
        page: requested_page(query.page),
        page_size: state.pagination.course_page_size,
    };
    let page = state.store.list_courses(&filter, request)?;
    let mut filters: Vec<(&str, String)> = Vec::new();
    if let Some(subject) = query.subject {
        filters.push(("subject", subject));
    }
    if let Some(number) = query.number {
        filters.push(("number", number));
    }
    if let Some(term) = query.term {
        filters.push(("term", term));
    }
    let links = page_links("/courses", page.page, page.total_pages, &filters);
    Ok(Json(CoursePage {
        courses: page.items,
        page: page.page,
        total_pages: page.total_pages,
        total_count: page.total_count,
        links,
    }))
}

/// `POST /courses`: creates a course. Admin only.
pub async fn create_course(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<NewCourse>,
) -> Result<impl IntoResponse, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::CourseCreate.as_str())?;
    for (name, value) in [
        ("subject", &body.subject),
        ("number", &body.number),
        ("title", &body.title),
        ("term", &body.term),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::validation(format!("{name} must be set")).into());
        }
    }
    check_access(
        &state,
        principal,
        ResourceAction::CourseCreate,
        OwnershipFacts::none(),
        "/courses",
    )?;
    let course = state.store.insert_course(&body)?;
    let response = CourseCreated {
        id: course.id,
        links: SelfLink::new(format!("/courses/{}", course.id)),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /courses/{id}`: public course detail.
pub async fn get_course(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<Course>, ApiFailure> {
    let id = CourseId::new(id);
    let course = found_or_404(state.store.get_course(id)?, &format!("course {id}"))?;
    Ok(Json(course))
}

/// `PATCH /courses/{id}`: partial update by admin or the owning instructor.
pub async fn update_course(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(patch): Json<CoursePatch>,
) -> Result<Json<Course>, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::CourseUpdate.as_str())?;
    if patch.is_empty() {
        return Err(ApiError::validation("patch must set at least one field").into());
    }
    let id = CourseId::new(id);
    let course = found_or_404(state.store.get_course(id)?, &format!("course {id}"))?;
    check_access(
        &state,
        principal,
        ResourceAction::CourseUpdate,
        owning_facts(principal, &course),
        &format!("/courses/{id}"),
    )?;
    let updated = found_or_404(state.store.update_course(id, &patch)?, &format!("course {id}"))?;
    Ok(Json(updated))
}

/// `DELETE /courses/{id}`: removes a course, its enrollments, assignments,
/// and submissions across both stores.
pub async fn delete_course(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::CourseDelete.as_str())?;
    let id = CourseId::new(id);
    let course = found_or_404(state.store.get_course(id)?, &format!("course {id}"))?;
    check_access(
        &state,
        principal,
        ResourceAction::CourseDelete,
        owning_facts(principal, &course),
        &format!("/courses/{id}"),
    )?;
    // Metadata first: cascades remove the relational subtree, then blobs.
    let blob_keys = state.store.blob_keys_for_course(id)?;
    state.store.delete_course(id)?;
    state.coordinator.purge_blobs(&blob_keys).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// SECTION: Roster Handlers
// ============================================================================

/// `GET /courses/{id}/students`: enrolled students, staff only.
pub async fn list_students(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<StudentList>, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::CourseRosterRead.as_str())?;
    let id = CourseId::new(id);
    let course = found_or_404(state.store.get_course(id)?, &format!("course {id}"))?;
    check_access(
        &state,
        principal,
        ResourceAction::CourseRosterRead,
        owning_facts(principal, &course),
        &format!("/courses/{id}/students"),
    )?;
    let students = state.store.list_students(id)?;
    Ok(Json(StudentList { students }))
}

/// `POST /courses/{id}/students`: applies an enrollment add/remove batch.
pub async fn update_enrollment(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(update): Json<EnrollmentUpdate>,
) -> Result<Json<EnrollmentResult>, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::EnrollmentUpdate.as_str())?;
    if update.is_empty() {
        return Err(ApiError::validation("add or remove must list at least one id").into());
    }
    let id = CourseId::new(id);
    let course = found_or_404(state.store.get_course(id)?, &format!("course {id}"))?;
    check_access(
        &state,
        principal,
        ResourceAction::EnrollmentUpdate,
        owning_facts(principal, &course),
        &format!("/courses/{id}/students"),
    )?;
    let result = state.store.update_enrollment(id, &update)?;
    Ok(Json(result))
}

/// `GET /courses/{id}/roster`: enrolled students as CSV, staff only.
pub async fn download_roster(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiFailure> {
    let principal = authenticate(&state, &headers, ResourceAction::CourseRosterRead.as_str())?;
    let id = CourseId::new(id);
    let course = found_or_404(state.store.get_course(id)?, &format!("course {id}"))?;
    check_access(
        &state,
        principal,
        ResourceAction::CourseRosterRead,
        owning_facts(principal, &course),
        &format!("/courses/{id}/roster"),
    )?;
    let students = state.store.list_students(id)?;
    let mut csv = String::new();
    for student in students {
        csv.push_str(&format!(
            "{},\"{}\",{}\n",
            student.id,
            student.name.replace('"', "\"\""),
            student.email
        ));
    }
    Ok(([(header::CONTENT_TYPE, "text/csv")], csv))
}

/// `GET /courses/{id}/assignments`: public assignment list for a course.
pub async fn list_assignments(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<AssignmentList>, ApiFailure> {
    let id = CourseId::new(id);
    found_or_404(state.store.get_course(id)?, &format!("course {id}"))?;
    let assignments = state.store.list_assignments(id)?;
    Ok(Json(AssignmentList { assignments }))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ownership facts for a course-scoped action.
pub(crate) fn owning_facts(principal: Principal, course: &Course) -> OwnershipFacts {
    OwnershipFacts {
        is_owning_instructor: course.instructor_id == principal.id,
        ..OwnershipFacts::none()
    }
}
