// crates/coursebook-core/src/authz.rs
// ============================================================================
// Module: Access Control Evaluator
// Description: Role and ownership authorization decisions for API actions.
// Purpose: Centralize every role/ownership rule in one pure, fail-closed
//          evaluator instead of per-route conditionals.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The access control evaluator computes whether a [`Principal`] may perform
//! a [`ResourceAction`] given precomputed [`OwnershipFacts`]. Decisions are
//! pure and deterministic; callers resolve the target and its parent chain
//! first (missing entities are "not found", never an authz decision) and
//! translate [`AccessDecision::Deny`] into a 403 response.
//!
//! ## Invariants
//! - Rules are evaluated in a fixed precedence order; the first match wins.
//! - Unknown combinations fail closed.
//! - The evaluator has no side effects; audit logging happens in callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::entities::Role;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Principal
// ============================================================================

/// Authenticated identity making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Authenticated user id.
    pub id: UserId,
    /// Role carried by the auth token.
    pub role: Role,
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Resource-scoped action being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceAction {
    /// Read a user's detail record.
    UserRead,
    /// Create a course.
    CourseCreate,
    /// Update a course's fields.
    CourseUpdate,
    /// Delete a course and everything under it.
    CourseDelete,
    /// Read the enrolled-student list or roster of a course.
    CourseRosterRead,
    /// Apply an enrollment add/remove batch to a course.
    EnrollmentUpdate,
    /// Create an assignment under a course.
    AssignmentCreate,
    /// Update an assignment's fields.
    AssignmentUpdate,
    /// Delete an assignment and its submissions.
    AssignmentDelete,
    /// List the submissions under an assignment.
    SubmissionList,
    /// Create a submission under an assignment.
    SubmissionCreate,
    /// Read a submission's metadata or stored file.
    SubmissionRead,
}

impl ResourceAction {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserRead => "user/read",
            Self::CourseCreate => "course/create",
            Self::CourseUpdate => "course/update",
            Self::CourseDelete => "course/delete",
            Self::CourseRosterRead => "course/roster",
            Self::EnrollmentUpdate => "course/enrollment",
            Self::AssignmentCreate => "assignment/create",
            Self::AssignmentUpdate => "assignment/update",
            Self::AssignmentDelete => "assignment/delete",
            Self::SubmissionList => "submission/list",
            Self::SubmissionCreate => "submission/create",
            Self::SubmissionRead => "submission/read",
        }
    }

    /// Returns true for actions governed by course ownership (rules 2 and 3).
    const fn is_instructor_scope(self) -> bool {
        matches!(
            self,
            Self::CourseUpdate
                | Self::CourseDelete
                | Self::CourseRosterRead
                | Self::EnrollmentUpdate
                | Self::AssignmentCreate
                | Self::AssignmentUpdate
                | Self::AssignmentDelete
                | Self::SubmissionList
        )
    }
}

// ============================================================================
// SECTION: Ownership Facts
// ============================================================================

/// Precomputed ownership booleans for the target and its parent chain.
///
/// # Invariants
/// - Facts describe relations only; they never imply access on their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnershipFacts {
    /// Principal id equals the target user id (user reads only).
    pub is_self: bool,
    /// Principal owns the course governing the action.
    pub is_owning_instructor: bool,
    /// Principal is enrolled in the course governing the action.
    pub is_enrolled_student: bool,
    /// Principal created the submission being read.
    pub is_submission_owner: bool,
}

impl OwnershipFacts {
    /// Facts with every relation false (no ownership context).
    #[must_use]
    pub const fn none() -> Self {
        Self {
            is_self: false,
            is_owning_instructor: false,
            is_enrolled_student: false,
            is_submission_owner: false,
        }
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The action is permitted.
    Allow,
    /// The action is refused with a stable reason label.
    Deny(&'static str),
}

impl AccessDecision {
    /// Returns true when the decision permits the action.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns the deny reason, or `None` for allows.
    #[must_use]
    pub const fn deny_reason(self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(reason),
        }
    }
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Authorizes `action` for `principal` given `facts`.
///
/// Rules are checked in precedence order; the first match wins:
/// 1. Admins may do anything.
/// 2. Course-scoped actions (update/delete/roster/enrollment) require the
///    owning instructor.
/// 3. Assignment-scoped actions (create/update/delete/list-submissions)
///    require the instructor owning the parent course.
/// 4. Submission create requires a student enrolled in the parent course.
/// 5. Submission read requires the enrolled owning student, or falls back to
///    rules 1-3 for staff.
/// 6. Everything else is denied.
#[must_use]
pub fn authorize(
    principal: Principal,
    action: ResourceAction,
    facts: OwnershipFacts,
) -> AccessDecision {
    if principal.role == Role::Admin {
        return AccessDecision::Allow;
    }
    if action.is_instructor_scope() {
        return if principal.role == Role::Instructor && facts.is_owning_instructor {
            AccessDecision::Allow
        } else if principal.role == Role::Instructor {
            AccessDecision::Deny("not the instructor of this course")
        } else {
            AccessDecision::Deny("requires admin or the owning instructor")
        };
    }
    match action {
        ResourceAction::UserRead => {
            if facts.is_self {
                AccessDecision::Allow
            } else {
                AccessDecision::Deny("users may only read their own record")
            }
        }
        ResourceAction::CourseCreate => AccessDecision::Deny("only admins may create courses"),
        ResourceAction::SubmissionCreate => {
            if principal.role == Role::Student && facts.is_enrolled_student {
                AccessDecision::Allow
            } else if principal.role == Role::Student {
                AccessDecision::Deny("not enrolled in this course")
            } else {
                AccessDecision::Deny("only enrolled students may submit")
            }
        }
        ResourceAction::SubmissionRead => {
            if principal.role == Role::Instructor && facts.is_owning_instructor {
                return AccessDecision::Allow;
            }
            if principal.role == Role::Student
                && facts.is_submission_owner
                && facts.is_enrolled_student
            {
                return AccessDecision::Allow;
            }
            AccessDecision::Deny("submission is not visible to this user")
        }
        // Instructor-scope actions were handled above; anything reaching this
        // arm is an unmatched combination and fails closed.
        _ => AccessDecision::Deny("not authorized"),
    }
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

    fn principal(id: i64, role: Role) -> Principal {
        Principal {
            id: UserId::new(id),
            role,
        }
    }

    #[test]
    fn admin_is_always_allowed() {
        let admin = principal(1, Role::Admin);
        for action in [
            ResourceAction::CourseCreate,
            ResourceAction::CourseDelete,
            ResourceAction::EnrollmentUpdate,
            ResourceAction::SubmissionRead,
        ] {
            assert!(authorize(admin, action, OwnershipFacts::none()).is_allowed());
        }
    }

    #[test]
    fn owning_instructor_may_manage_course_and_assignments() {
        let instructor = principal(3, Role::Instructor);
        let owning = OwnershipFacts {
            is_owning_instructor: true,
            ..OwnershipFacts::none()
        };
        for action in [
            ResourceAction::CourseUpdate,
            ResourceAction::CourseRosterRead,
            ResourceAction::EnrollmentUpdate,
            ResourceAction::AssignmentCreate,
            ResourceAction::AssignmentDelete,
            ResourceAction::SubmissionList,
        ] {
            assert!(authorize(instructor, action, owning).is_allowed());
            assert!(!authorize(instructor, action, OwnershipFacts::none()).is_allowed());
        }
    }

    #[test]
    fn non_owning_instructor_is_denied_with_ownership_reason() {
        let instructor = principal(4, Role::Instructor);
        let decision =
            authorize(instructor, ResourceAction::AssignmentUpdate, OwnershipFacts::none());
        assert_eq!(decision.deny_reason(), Some("not the instructor of this course"));
    }

    #[test]
    fn instructors_may_not_create_courses() {
        let instructor = principal(3, Role::Instructor);
        assert!(!authorize(instructor, ResourceAction::CourseCreate, OwnershipFacts::none())
            .is_allowed());
    }

    #[test]
    fn enrolled_student_may_submit_and_unenrolled_may_not() {
        let student = principal(5, Role::Student);
        let enrolled = OwnershipFacts {
            is_enrolled_student: true,
            ..OwnershipFacts::none()
        };
        assert!(authorize(student, ResourceAction::SubmissionCreate, enrolled).is_allowed());
        let decision =
            authorize(student, ResourceAction::SubmissionCreate, OwnershipFacts::none());
        assert_eq!(decision.deny_reason(), Some("not enrolled in this course"));
    }

    #[test]
    fn submission_read_requires_enrolled_owner_for_students() {
        let student = principal(5, Role::Student);
        let owner_enrolled = OwnershipFacts {
            is_submission_owner: true,
            is_enrolled_student: true,
            ..OwnershipFacts::none()
        };
        let owner_unenrolled = OwnershipFacts {
            is_submission_owner: true,
            ..OwnershipFacts::none()
        };
        let enrolled_non_owner = OwnershipFacts {
            is_enrolled_student: true,
            ..OwnershipFacts::none()
        };
        assert!(authorize(student, ResourceAction::SubmissionRead, owner_enrolled).is_allowed());
        assert!(!authorize(student, ResourceAction::SubmissionRead, owner_unenrolled).is_allowed());
        assert!(
            !authorize(student, ResourceAction::SubmissionRead, enrolled_non_owner).is_allowed()
        );
    }

    #[test]
    fn submission_read_allows_owning_instructor() {
        let instructor = principal(3, Role::Instructor);
        let owning = OwnershipFacts {
            is_owning_instructor: true,
            ..OwnershipFacts::none()
        };
        assert!(authorize(instructor, ResourceAction::SubmissionRead, owning).is_allowed());
        assert!(
            !authorize(instructor, ResourceAction::SubmissionRead, OwnershipFacts::none())
                .is_allowed()
        );
    }

    #[test]
    fn user_read_is_self_or_admin() {
        let student = principal(5, Role::Student);
        let this_user = OwnershipFacts {
            is_self: true,
            ..OwnershipFacts::none()
        };
        assert!(authorize(student, ResourceAction::UserRead, this_user).is_allowed());
        assert!(!authorize(student, ResourceAction::UserRead, OwnershipFacts::none()).is_allowed());
        assert!(
            authorize(principal(1, Role::Admin), ResourceAction::UserRead, OwnershipFacts::none())
                .is_allowed()
        );
    }

    #[test]
    fn students_never_reach_instructor_scope_actions() {
        let student = principal(5, Role::Student);
        let all_facts = OwnershipFacts {
            is_self: true,
            is_owning_instructor: true,
            is_enrolled_student: true,
            is_submission_owner: true,
        };
        for action in [
            ResourceAction::CourseUpdate,
            ResourceAction::CourseDelete,
            ResourceAction::AssignmentCreate,
            ResourceAction::SubmissionList,
        ] {
            assert!(!authorize(student, action, all_facts).is_allowed());
        }
    }
}
