// crates/coursebook-core/src/entities.rs
// ============================================================================
// Module: Coursebook Entities
// Description: Domain entity models for users, courses, assignments, and
//              submissions.
// Purpose: Provide the canonical record shapes shared by the store and the
//          HTTP layer.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Entity models mirror the relational schema: [`User`], [`Course`],
//! [`Assignment`], and [`Submission`] rows plus the insert/patch payloads the
//! HTTP layer validates before handing them to the store. Enrollment is a
//! pure (course, student) pair relation and has no entity of its own; the
//! [`EnrollmentUpdate`] / [`EnrollmentResult`] pair carries roster changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AssignmentId;
use crate::identifiers::BlobKey;
use crate::identifiers::CourseId;
use crate::identifiers::SubmissionId;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Role attached to a user account. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Owns and manages courses.
    Instructor,
    /// Enrolls in courses and submits work.
    Student,
}

impl Role {
    /// Returns the stable storage label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Instructor => "instructor",
            Self::Student => "student",
        }
    }

    /// Parses a storage label back into a role.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "instructor" => Some(Self::Instructor),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Stored user record.
///
/// # Invariants
/// - `email` is unique across all users.
/// - `password_hash` is never serialized into API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Row identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Unique email address used for login.
    pub email: String,
    /// Stored password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account role.
    pub role: Role,
}

/// Payload for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email address; must be unique.
    pub email: String,
    /// Plaintext password, hashed before storage.
    pub password: String,
    /// Requested role.
    pub role: Role,
}

// ============================================================================
// SECTION: Courses
// ============================================================================

/// Stored course record.
///
/// Course responses intentionally exclude the enrolled-student list and the
/// assignment list; both have their own collection endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    /// Row identifier.
    pub id: CourseId,
    /// Subject code (e.g. "CS").
    pub subject: String,
    /// Course number (e.g. "493").
    pub number: String,
    /// Course title.
    pub title: String,
    /// Academic term (e.g. "sp22").
    pub term: String,
    /// Owning instructor.
    pub instructor_id: UserId,
}

/// Payload for creating a course.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    /// Subject code.
    pub subject: String,
    /// Course number.
    pub number: String,
    /// Course title.
    pub title: String,
    /// Academic term.
    pub term: String,
    /// Owning instructor; must reference a user with the instructor role.
    pub instructor_id: UserId,
}

/// Partial update payload for a course. All fields optional; an empty patch
/// is rejected at the validation boundary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoursePatch {
    /// Replacement subject code.
    pub subject: Option<String>,
    /// Replacement course number.
    pub number: Option<String>,
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement term.
    pub term: Option<String>,
    /// Replacement owning instructor.
    pub instructor_id: Option<UserId>,
}

impl CoursePatch {
    /// Returns true when the patch carries no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.number.is_none()
            && self.title.is_none()
            && self.term.is_none()
            && self.instructor_id.is_none()
    }
}

/// Filter criteria for course listings. Empty strings match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFilter {
    /// Subject code filter.
    pub subject: Option<String>,
    /// Course number filter.
    pub number: Option<String>,
    /// Term filter.
    pub term: Option<String>,
}

// ============================================================================
// SECTION: Enrollment
// ============================================================================

/// Roster change request: student ids to add and remove.
///
/// # Invariants
/// - At least one of `add` / `remove` must be non-empty; enforced at the
///   request validation boundary before any ledger operation runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentUpdate {
    /// Student ids to enroll.
    #[serde(default)]
    pub add: Vec<UserId>,
    /// Student ids to unenroll.
    #[serde(default)]
    pub remove: Vec<UserId>,
}

impl EnrollmentUpdate {
    /// Returns true when both batches are empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Roster change outcome: the ids that actually changed state.
///
/// Idempotence: re-adding an enrolled student or removing an unenrolled one
/// is a silent no-op and does not appear in the result lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrollmentResult {
    /// Ids newly enrolled by this request.
    pub added: Vec<UserId>,
    /// Ids actually removed by this request.
    pub removed: Vec<UserId>,
}

// ============================================================================
// SECTION: Assignments
// ============================================================================

/// Stored assignment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    /// Row identifier.
    pub id: AssignmentId,
    /// Owning course.
    pub course_id: CourseId,
    /// Assignment title.
    pub title: String,
    /// Maximum points.
    pub points: i64,
    /// Due date in RFC 3339 form.
    pub due: String,
}

/// Payload for creating an assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    /// Owning course.
    pub course_id: CourseId,
    /// Assignment title.
    pub title: String,
    /// Maximum points.
    pub points: i64,
    /// Due date in RFC 3339 form.
    pub due: String,
}

/// Partial update payload for an assignment.
///
/// `course_id` is deliberately absent: an assignment cannot be moved between
/// courses, which would silently re-home its submissions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentPatch {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement maximum points.
    pub points: Option<i64>,
    /// Replacement due date.
    pub due: Option<String>,
}

impl AssignmentPatch {
    /// Returns true when the patch carries no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.points.is_none() && self.due.is_none()
    }
}

// ============================================================================
// SECTION: Submissions
// ============================================================================

/// Stored submission metadata row.
///
/// The binary payload lives in the object store under `blob_key`; a
/// submission is valid only when both records exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    /// Row identifier.
    pub id: SubmissionId,
    /// Owning assignment.
    pub assignment_id: AssignmentId,
    /// Submitting student.
    pub student_id: UserId,
    /// Server-assigned creation time (unix milliseconds).
    pub timestamp: i64,
    /// Generated object-store key for the payload.
    pub blob_key: BlobKey,
    /// Client-supplied original filename (display only).
    pub filename: String,
    /// Stored payload content type.
    pub content_type: String,
}

/// Payload for inserting submission metadata after the blob write succeeded.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    /// Owning assignment.
    pub assignment_id: AssignmentId,
    /// Submitting student.
    pub student_id: UserId,
    /// Server-assigned creation time (unix milliseconds).
    pub timestamp: i64,
    /// Generated object-store key for the payload.
    pub blob_key: BlobKey,
    /// Client-supplied original filename.
    pub filename: String,
    /// Stored payload content type.
    pub content_type: String,
}

/// Filter criteria for submission listings under an assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    /// Restrict to a single student when set.
    pub student_id: Option<UserId>,
}
