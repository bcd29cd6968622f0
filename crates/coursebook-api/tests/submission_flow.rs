// crates/coursebook-api/tests/submission_flow.rs
// ============================================================================
// Module: Submission Flow Tests
// Description: Coordinator tests across the blob store and relational store.
// Purpose: Validate the blob-first write order, compensating cleanup, and
//          batch purge reporting.
// ============================================================================

//! ## Overview
//! These tests drive the submission coordinator against a real on-disk
//! SQLite store and the in-process blob store:
//! - A successful create leaves one blob and one metadata row.
//! - A failed metadata insert deletes the blob written first.
//! - A failed compensating delete is reported as an orphaned blob.
//! - Batch purge reports partial failures with a count.

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

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use coursebook_api::AuditSink;
use coursebook_api::BlobStore;
use coursebook_api::InMemoryBlobStore;
use coursebook_api::NoopAuditSink;
use coursebook_api::SubmissionCoordinator;
use coursebook_api::audit::AuditEvent;
use coursebook_api::object_store::BlobDownload;
use coursebook_api::object_store::BlobStoreError;
use coursebook_api::object_store::PayloadSpool;
use coursebook_core::ApiError;
use coursebook_core::AssignmentId;
use coursebook_core::BlobKey;
use coursebook_core::EnrollmentUpdate;
use coursebook_core::NewAssignment;
use coursebook_core::NewCourse;
use coursebook_core::Role;
use coursebook_core::UserId;
use coursebook_store_sqlite::SqliteStore;
use coursebook_store_sqlite::SqliteStoreConfig;
use coursebook_store_sqlite::SqliteStoreMode;
use coursebook_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open_store(dir: &TempDir) -> SqliteStore {
    let config = SqliteStoreConfig {
        path: dir.path().join("coursebook.db"),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Normal,
    };
    SqliteStore::new(&config).expect("open store")
}

/// Seeds an instructor, a course, an enrolled student, and an assignment.
fn seed_assignment(store: &SqliteStore) -> (AssignmentId, UserId) {
    let instructor = store
        .insert_user("Ada Lovelace", "ada@example.edu", "hash", Role::Instructor)
        .expect("instructor");
    let student = store
        .insert_user("Grace Hopper", "grace@example.edu", "hash", Role::Student)
        .expect("student");
    let course = store
        .insert_course(&NewCourse {
            subject: "CS".to_string(),
            number: "493".to_string(),
            title: "Cloud Application Development".to_string(),
            term: "sp26".to_string(),
            instructor_id: instructor.id,
        })
        .expect("course");
    let assignment = store
        .insert_assignment(&NewAssignment {
            course_id: course.id,
            title: "Final Project".to_string(),
            points: 100,
            due: "2026-06-14T23:59:59Z".to_string(),
        })
        .expect("assignment");
    store
        .update_enrollment(
            course.id,
            &EnrollmentUpdate {
                add: vec![student.id],
                remove: Vec::new(),
            },
        )
        .expect("enroll");
    (assignment.id, student.id)
}

async fn spool(payload: &[u8]) -> PayloadSpool {
    PayloadSpool::from_bytes(payload).await.expect("spool")
}

/// Audit sink that captures serialized events for assertions.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<serde_json::Value>>,
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &AuditEvent) {
        let value = serde_json::to_value(event).expect("serialize event");
        self.events.lock().expect("lock").push(value);
    }
}

impl RecordingSink {
    fn events_named(&self, name: &str) -> Vec<serde_json::Value> {
        self.events
            .lock()
            .expect("lock")
            .iter()
            .filter(|event| event.get("event").and_then(|v| v.as_str()) == Some(name))
            .cloned()
            .collect()
    }
}

/// Blob store whose deletes always fail, for orphan-path tests.
struct StuckDeleteStore {
    inner: InMemoryBlobStore,
}

#[async_trait]
impl BlobStore for StuckDeleteStore {
    async fn put(
        &self,
        key: &BlobKey,
        content_type: &str,
        payload: &PayloadSpool,
    ) -> Result<(), BlobStoreError> {
        self.inner.put(key, content_type, payload).await
    }

    async fn open(&self, key: &BlobKey) -> Result<BlobDownload, BlobStoreError> {
        self.inner.open(key).await
    }

    async fn delete(&self, _key: &BlobKey) -> Result<(), BlobStoreError> {
        Err(BlobStoreError::Backend("delete unavailable".to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn successful_create_stores_blob_then_metadata() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let (assignment_id, student_id) = seed_assignment(&store);
    let blobs = Arc::new(InMemoryBlobStore::new());
    let coordinator =
        SubmissionCoordinator::new(store.clone(), blobs.clone(), Arc::new(NoopAuditSink));

    let submission = coordinator
        .create(
            assignment_id,
            student_id,
            "essay.pdf".to_string(),
            "application/pdf".to_string(),
            &spool(b"%PDF-1.7").await,
        )
        .await
        .expect("create submission");

    assert_eq!(blobs.len().expect("len"), 1);
    let stored = store
        .get_submission(submission.id)
        .expect("query")
        .expect("row");
    assert_eq!(stored.filename, "essay.pdf");
    assert_eq!(stored.content_type, "application/pdf");
    assert!(stored.blob_key.as_str().starts_with("submissions/"));

    let mut download = coordinator.open_file(&stored.blob_key).await.expect("open");
    assert_eq!(download.content_type, "application/pdf");
    use tokio_stream::StreamExt;
    let chunk = download.stream.next().await.expect("chunk").expect("bytes");
    assert_eq!(chunk, Bytes::from_static(b"%PDF-1.7"));
}

#[tokio::test]
async fn failed_metadata_insert_removes_the_blob() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let blobs = Arc::new(InMemoryBlobStore::new());
    let coordinator =
        SubmissionCoordinator::new(store.clone(), blobs.clone(), Arc::new(NoopAuditSink));

    // No assignment exists, so the metadata insert fails after the blob
    // write succeeded.
    let result = coordinator
        .create(
            AssignmentId::new(999),
            UserId::new(999),
            "essay.pdf".to_string(),
            "application/pdf".to_string(),
            &spool(b"payload").await,
        )
        .await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
    assert!(blobs.is_empty().expect("empty"));
}

#[tokio::test]
async fn failed_compensating_delete_is_reported_as_orphan() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let sink = Arc::new(RecordingSink::default());
    let blobs = Arc::new(StuckDeleteStore {
        inner: InMemoryBlobStore::new(),
    });
    let coordinator = SubmissionCoordinator::new(store, blobs, sink.clone());

    let result = coordinator
        .create(
            AssignmentId::new(999),
            UserId::new(999),
            "essay.pdf".to_string(),
            "application/pdf".to_string(),
            &spool(b"payload").await,
        )
        .await;

    // The client still sees the original failure; the orphan is audited.
    assert!(matches!(result, Err(ApiError::NotFound(_))));
    let orphans = sink.events_named("orphaned_blob");
    assert_eq!(orphans.len(), 1);
    let resource = orphans[0].get("resource").and_then(|v| v.as_str()).expect("resource");
    assert!(resource.starts_with("submissions/999/999/"));
}

#[tokio::test]
async fn purge_reports_partial_failure_counts() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let sink = Arc::new(RecordingSink::default());
    let blobs = Arc::new(StuckDeleteStore {
        inner: InMemoryBlobStore::new(),
    });
    let coordinator = SubmissionCoordinator::new(store, blobs, sink.clone());

    let keys = vec![BlobKey::new("submissions/1/1/aa"), BlobKey::new("submissions/1/2/bb")];
    let err = coordinator.purge_blobs(&keys).await.expect_err("must fail");
    assert!(err.to_string().contains("2 of 2"));
    assert_eq!(sink.events_named("orphaned_blob").len(), 2);
}

#[tokio::test]
async fn purge_of_existing_blobs_empties_the_store() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let (assignment_id, student_id) = seed_assignment(&store);
    let blobs = Arc::new(InMemoryBlobStore::new());
    let coordinator =
        SubmissionCoordinator::new(store.clone(), blobs.clone(), Arc::new(NoopAuditSink));

    for name in ["a.txt", "b.txt"] {
        coordinator
            .create(
                assignment_id,
                student_id,
                name.to_string(),
                "text/plain".to_string(),
                &spool(b"work").await,
            )
            .await
            .expect("create");
    }
    let keys = store.blob_keys_for_assignment(assignment_id).expect("keys");
    assert_eq!(keys.len(), 2);
    store.delete_assignment(assignment_id).expect("delete assignment");
    coordinator.purge_blobs(&keys).await.expect("purge");
    assert!(blobs.is_empty().expect("empty"));
}
