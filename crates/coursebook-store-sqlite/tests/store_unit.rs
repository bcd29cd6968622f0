// crates/coursebook-store-sqlite/tests/store_unit.rs
// ============================================================================
// Module: SQLite Store Unit Tests
// Description: Targeted tests for the Coursebook relational store.
// Purpose: Validate uniqueness enforcement, enrollment idempotence, cascade
//          deletes, pagination, and role checks.
// ============================================================================

//! ## Overview
//! Unit-level tests for relational store invariants:
//! - Email uniqueness and role label round-trips
//! - Enrollment ledger idempotence and add/remove ordering
//! - Cascade deletes across courses, assignments, and submissions
//! - Filtered, offset-paginated listings ordered by row id

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use coursebook_core::AssignmentPatch;
use coursebook_core::BlobKey;
use coursebook_core::CourseFilter;
use coursebook_core::CoursePatch;
use coursebook_core::EnrollmentUpdate;
use coursebook_core::NewAssignment;
use coursebook_core::NewCourse;
use coursebook_core::NewSubmission;
use coursebook_core::PageRequest;
use coursebook_core::Role;
use coursebook_core::SubmissionFilter;
use coursebook_core::UserId;
use coursebook_store_sqlite::SqliteStore;
use coursebook_store_sqlite::SqliteStoreConfig;
use coursebook_store_sqlite::SqliteStoreError;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open_store(dir: &TempDir) -> SqliteStore {
    let config = SqliteStoreConfig {
        path: dir.path().join("coursebook.db"),
        busy_timeout_ms: 1_000,
        journal_mode: coursebook_store_sqlite::SqliteStoreMode::Wal,
        sync_mode: coursebook_store_sqlite::SqliteSyncMode::Normal,
    };
    SqliteStore::new(&config).expect("open store")
}

fn seed_instructor(store: &SqliteStore, email: &str) -> coursebook_core::User {
    store
        .insert_user("Instructor", email, "hash", Role::Instructor)
        .expect("insert instructor")
}

fn seed_student(store: &SqliteStore, email: &str) -> coursebook_core::User {
    store.insert_user("Student", email, "hash", Role::Student).expect("insert student")
}

fn seed_course(store: &SqliteStore, instructor: UserId, term: &str) -> coursebook_core::Course {
    store
        .insert_course(&NewCourse {
            subject: "CS".to_string(),
            number: "493".to_string(),
            title: "Cloud Application Development".to_string(),
            term: term.to_string(),
            instructor_id: instructor,
        })
        .expect("insert course")
}

fn enroll(store: &SqliteStore, course: coursebook_core::CourseId, students: &[UserId]) {
    store
        .update_enrollment(
            course,
            &EnrollmentUpdate {
                add: students.to_vec(),
                remove: Vec::new(),
            },
        )
        .expect("enroll");
}

fn page(page: u64, page_size: u64) -> PageRequest {
    PageRequest {
        page,
        page_size,
    }
}

// ============================================================================
// SECTION: Users
// ============================================================================

#[test]
fn duplicate_email_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    seed_student(&store, "dup@example.edu");
    let err = store
        .insert_user("Other", "dup@example.edu", "hash2", Role::Student)
        .expect_err("duplicate email must fail");
    assert!(matches!(err, SqliteStoreError::Duplicate(_)));
}

#[test]
fn user_round_trips_by_id_and_email() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let created = seed_instructor(&store, "teach@example.edu");
    let by_id = store.get_user(created.id).expect("get").expect("present");
    assert_eq!(by_id, created);
    let by_email =
        store.find_user_by_email("teach@example.edu").expect("find").expect("present");
    assert_eq!(by_email.id, created.id);
    assert_eq!(by_email.role, Role::Instructor);
}

// ============================================================================
// SECTION: Courses
// ============================================================================

#[test]
fn course_instructor_must_hold_instructor_role() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let student = seed_student(&store, "s@example.edu");
    let err = store
        .insert_course(&NewCourse {
            subject: "CS".to_string(),
            number: "101".to_string(),
            title: "Intro".to_string(),
            term: "fa26".to_string(),
            instructor_id: student.id,
        })
        .expect_err("student cannot own a course");
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn course_listing_filters_and_paginates() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    for term in ["sp26", "sp26", "sp26", "fa26", "fa26"] {
        seed_course(&store, instructor.id, term);
    }
    let all = store
        .list_courses(&CourseFilter::default(), page(1, 2))
        .expect("list all");
    assert_eq!(all.total_count, 5);
    assert_eq!(all.total_pages, 3);
    assert_eq!(all.items.len(), 2);
    let spring = store
        .list_courses(
            &CourseFilter {
                term: Some("sp26".to_string()),
                ..CourseFilter::default()
            },
            page(1, 10),
        )
        .expect("list spring");
    assert_eq!(spring.total_count, 3);
    assert!(spring.items.iter().all(|course| course.term == "sp26"));
    // Requests past the end clamp to the last page.
    let clamped = store
        .list_courses(&CourseFilter::default(), page(9, 2))
        .expect("list clamped");
    assert_eq!(clamped.page, 3);
    assert_eq!(clamped.items.len(), 1);
}

#[test]
fn course_patch_updates_only_named_fields() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let course = seed_course(&store, instructor.id, "sp26");
    let updated = store
        .update_course(
            course.id,
            &CoursePatch {
                title: Some("Distributed Systems".to_string()),
                ..CoursePatch::default()
            },
        )
        .expect("update")
        .expect("present");
    assert_eq!(updated.title, "Distributed Systems");
    assert_eq!(updated.subject, course.subject);
    assert_eq!(updated.term, course.term);
}

// ============================================================================
// SECTION: Enrollment Ledger
// ============================================================================

#[test]
fn enrollment_add_and_remove_are_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let course = seed_course(&store, instructor.id, "sp26");
    let alice = seed_student(&store, "alice@example.edu");
    let bob = seed_student(&store, "bob@example.edu");

    let first = store
        .update_enrollment(
            course.id,
            &EnrollmentUpdate {
                add: vec![alice.id, bob.id],
                remove: Vec::new(),
            },
        )
        .expect("enroll");
    assert_eq!(first.added, vec![alice.id, bob.id]);

    // Re-adding an enrolled student changes nothing.
    let repeat = store
        .update_enrollment(
            course.id,
            &EnrollmentUpdate {
                add: vec![alice.id],
                remove: Vec::new(),
            },
        )
        .expect("re-enroll");
    assert!(repeat.added.is_empty());

    // Removing an absent student changes nothing either.
    let removal = store
        .update_enrollment(
            course.id,
            &EnrollmentUpdate {
                add: Vec::new(),
                remove: vec![bob.id, UserId::new(9_999)],
            },
        )
        .expect("remove");
    assert_eq!(removal.removed, vec![bob.id]);
    assert_eq!(store.list_student_ids(course.id).expect("roster"), vec![alice.id]);
}

#[test]
fn enrollment_id_in_both_lists_lands_removed() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let course = seed_course(&store, instructor.id, "sp26");
    let alice = seed_student(&store, "alice@example.edu");
    // Additions apply before removals, so the net effect is unenrolled.
    let result = store
        .update_enrollment(
            course.id,
            &EnrollmentUpdate {
                add: vec![alice.id],
                remove: vec![alice.id],
            },
        )
        .expect("conflicting update");
    assert_eq!(result.added, vec![alice.id]);
    assert_eq!(result.removed, vec![alice.id]);
    assert!(store.list_student_ids(course.id).expect("roster").is_empty());
}

#[test]
fn enrollment_skips_non_students_and_unknown_ids() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let other = seed_instructor(&store, "other@example.edu");
    let course = seed_course(&store, instructor.id, "sp26");
    let alice = seed_student(&store, "alice@example.edu");
    // Bad ids never fail the batch; the valid student still lands.
    let result = store
        .update_enrollment(
            course.id,
            &EnrollmentUpdate {
                add: vec![other.id, UserId::new(9_999), alice.id],
                remove: Vec::new(),
            },
        )
        .expect("batch succeeds");
    assert_eq!(result.added, vec![alice.id]);
    assert_eq!(store.list_student_ids(course.id).expect("roster"), vec![alice.id]);
}

// ============================================================================
// SECTION: Assignments and Submissions
// ============================================================================

fn seed_assignment(
    store: &SqliteStore,
    course: coursebook_core::CourseId,
) -> coursebook_core::Assignment {
    store
        .insert_assignment(&NewAssignment {
            course_id: course,
            title: "Project 1".to_string(),
            points: 100,
            due: "2026-11-14T17:00:00-07:00".to_string(),
        })
        .expect("insert assignment")
}

#[test]
fn assignment_patch_cannot_rehome_course() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let course = seed_course(&store, instructor.id, "sp26");
    let assignment = seed_assignment(&store, course.id);
    let updated = store
        .update_assignment(
            assignment.id,
            &AssignmentPatch {
                points: Some(50),
                ..AssignmentPatch::default()
            },
        )
        .expect("update")
        .expect("present");
    assert_eq!(updated.points, 50);
    assert_eq!(updated.course_id, course.id);
}

#[test]
fn submission_listing_filters_by_student() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let course = seed_course(&store, instructor.id, "sp26");
    let assignment = seed_assignment(&store, course.id);
    let alice = seed_student(&store, "alice@example.edu");
    let bob = seed_student(&store, "bob@example.edu");
    enroll(&store, course.id, &[alice.id, bob.id]);
    for (index, student) in [alice.id, alice.id, bob.id, alice.id].iter().enumerate() {
        store
            .insert_submission(&NewSubmission {
                assignment_id: assignment.id,
                student_id: *student,
                timestamp: 1_700_000_000_000 + i64::try_from(index).expect("index"),
                blob_key: BlobKey::new(format!("blob-{index}")),
                filename: format!("work-{index}.pdf"),
                content_type: "application/pdf".to_string(),
            })
            .expect("insert submission");
    }
    let all = store
        .list_submissions(assignment.id, SubmissionFilter::default(), page(1, 3))
        .expect("list all");
    assert_eq!(all.total_count, 4);
    assert_eq!(all.total_pages, 2);
    let alices = store
        .list_submissions(
            assignment.id,
            SubmissionFilter {
                student_id: Some(alice.id),
            },
            page(1, 3),
        )
        .expect("list filtered");
    assert_eq!(alices.total_count, 3);
    assert!(alices.items.iter().all(|item| item.student_id == alice.id));
}

#[test]
fn submission_rows_require_an_enrolled_student() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let course = seed_course(&store, instructor.id, "sp26");
    let assignment = seed_assignment(&store, course.id);
    let alice = seed_student(&store, "alice@example.edu");
    let record = |student: UserId| NewSubmission {
        assignment_id: assignment.id,
        student_id: student,
        timestamp: 1_700_000_000_000,
        blob_key: BlobKey::new("blob-unenrolled"),
        filename: "work.pdf".to_string(),
        content_type: "application/pdf".to_string(),
    };

    // Alice exists but is not on the roster yet.
    assert!(matches!(
        store.insert_submission(&record(alice.id)),
        Err(SqliteStoreError::Invalid(_))
    ));
    // Instructors never appear as submitters, enrolled or not.
    assert!(matches!(
        store.insert_submission(&record(instructor.id)),
        Err(SqliteStoreError::Invalid(_))
    ));
    // Unknown users are missing, not merely invalid.
    assert!(matches!(
        store.insert_submission(&record(UserId::new(9_999))),
        Err(SqliteStoreError::Missing(_))
    ));

    enroll(&store, course.id, &[alice.id]);
    let stored = store.insert_submission(&record(alice.id)).expect("insert");
    assert_eq!(stored.student_id, alice.id);
}

#[test]
fn deleting_a_course_cascades_and_reports_blob_keys() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let course = seed_course(&store, instructor.id, "sp26");
    let assignment = seed_assignment(&store, course.id);
    let alice = seed_student(&store, "alice@example.edu");
    store
        .update_enrollment(
            course.id,
            &EnrollmentUpdate {
                add: vec![alice.id],
                remove: Vec::new(),
            },
        )
        .expect("enroll");
    let submission = store
        .insert_submission(&NewSubmission {
            assignment_id: assignment.id,
            student_id: alice.id,
            timestamp: 1_700_000_000_000,
            blob_key: BlobKey::new("blob-cascade"),
            filename: "work.pdf".to_string(),
            content_type: "application/pdf".to_string(),
        })
        .expect("insert submission");

    let keys = store.blob_keys_for_course(course.id).expect("keys");
    assert_eq!(keys, vec![BlobKey::new("blob-cascade")]);

    assert!(store.delete_course(course.id).expect("delete"));
    assert!(store.get_course(course.id).expect("get course").is_none());
    assert!(store.get_assignment(assignment.id).expect("get assignment").is_none());
    assert!(store.get_submission(submission.id).expect("get submission").is_none());
    assert!(store.list_student_ids(course.id).expect("roster").is_empty());
    // The student record itself survives the cascade.
    assert!(store.get_user(alice.id).expect("get user").is_some());
}

#[test]
fn deleting_an_assignment_cascades_submissions_only() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let course = seed_course(&store, instructor.id, "sp26");
    let assignment = seed_assignment(&store, course.id);
    let alice = seed_student(&store, "alice@example.edu");
    enroll(&store, course.id, &[alice.id]);
    let submission = store
        .insert_submission(&NewSubmission {
            assignment_id: assignment.id,
            student_id: alice.id,
            timestamp: 1_700_000_000_000,
            blob_key: BlobKey::new("blob-1"),
            filename: "work.pdf".to_string(),
            content_type: "application/pdf".to_string(),
        })
        .expect("insert submission");
    let keys = store.blob_keys_for_assignment(assignment.id).expect("keys");
    assert_eq!(keys, vec![BlobKey::new("blob-1")]);
    assert!(store.delete_assignment(assignment.id).expect("delete"));
    assert!(store.get_submission(submission.id).expect("get").is_none());
    assert!(store.get_course(course.id).expect("course").is_some());
}

#[test]
fn taught_and_enrolled_course_ids_track_ownership() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let instructor = seed_instructor(&store, "teach@example.edu");
    let other = seed_instructor(&store, "other@example.edu");
    let first = seed_course(&store, instructor.id, "sp26");
    let second = seed_course(&store, instructor.id, "fa26");
    let foreign = seed_course(&store, other.id, "fa26");
    let alice = seed_student(&store, "alice@example.edu");
    store
        .update_enrollment(
            foreign.id,
            &EnrollmentUpdate {
                add: vec![alice.id],
                remove: Vec::new(),
            },
        )
        .expect("enroll");
    assert_eq!(
        store.courses_taught_by(instructor.id).expect("taught"),
        vec![first.id, second.id]
    );
    assert_eq!(store.courses_enrolled_in(alice.id).expect("enrolled"), vec![foreign.id]);
}
