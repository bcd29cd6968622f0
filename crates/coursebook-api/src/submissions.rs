// crates/coursebook-api/src/submissions.rs
// ============================================================================
// Module: Submission Coordinator
// Description: Two-store write path for submission payloads and metadata.
// Purpose: Keep the blob store and the relational store consistent with a
//          blob-first write order and compensating cleanup.
// Dependencies: coursebook-core, coursebook-store-sqlite, rand
// ============================================================================

//! ## Overview
//! A submission spans two stores: its payload lives in the blob store and
//! its metadata row in SQLite. The coordinator writes the blob first, then
//! the metadata row; when the metadata insert fails it deletes the blob it
//! just wrote. A failed compensating delete is reported as an orphaned-blob
//! audit event rather than surfaced to the client, since the client-visible
//! outcome is already a failure. Orphaned blobs are unreachable garbage,
//! never dangling metadata.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use coursebook_core::ApiError;
use coursebook_core::AssignmentId;
use coursebook_core::BlobKey;
use coursebook_core::NewSubmission;
use coursebook_core::Submission;
use coursebook_core::UserId;
use coursebook_store_sqlite::SqliteStore;
use rand::RngCore;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::object_store::BlobDownload;
use crate::object_store::BlobStore;
use crate::object_store::PayloadSpool;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Random bytes in a generated blob key suffix.
const BLOB_KEY_RANDOM_BYTES: usize = 16;

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Coordinates submission writes across the blob store and the relational
/// store.
pub struct SubmissionCoordinator {
    /// Relational store for submission metadata.
    store: SqliteStore,
    /// Blob store for submission payloads.
    blobs: Arc<dyn BlobStore>,
    /// Sink for orphaned-blob reports.
    audit: Arc<dyn AuditSink>,
}

impl SubmissionCoordinator {
    /// Creates a coordinator over the two stores.
    #[must_use]
    pub fn new(store: SqliteStore, blobs: Arc<dyn BlobStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, blobs, audit }
    }

    /// Creates a submission: payload first, metadata second.
    ///
    /// The payload write happens before the metadata insert so a failure in
    /// either step never leaves metadata pointing at a missing blob. When
    /// the metadata insert fails, the blob written in the first step is
    /// deleted again; if that compensating delete also fails, the key is
    /// reported through the audit sink and the original error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when either store rejects the write.
    pub async fn create(
        &self,
        assignment_id: AssignmentId,
        student_id: UserId,
        filename: String,
        content_type: String,
        payload: &PayloadSpool,
    ) -> Result<Submission, ApiError> {
        let blob_key = generate_blob_key(assignment_id, student_id);
        self.blobs.put(&blob_key, &content_type, payload).await?;
        let record = NewSubmission {
            assignment_id,
            student_id,
            timestamp: now_unix_ms(),
            blob_key: blob_key.clone(),
            filename,
            content_type,
        };
        match self.store.insert_submission(&record) {
            Ok(submission) => Ok(submission),
            Err(insert_err) => {
                if let Err(delete_err) = self.blobs.delete(&blob_key).await {
                    self.audit.record(&AuditEvent::orphaned_blob(
                        blob_key.as_str(),
                        &delete_err.to_string(),
                    ));
                }
                Err(insert_err.into())
            }
        }
    }

    /// Opens the stored payload for a submission.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the blob is missing and
    /// [`ApiError::Storage`] on backend failure.
    pub async fn open_file(&self, key: &BlobKey) -> Result<BlobDownload, ApiError> {
        Ok(self.blobs.open(key).await?)
    }

    /// Deletes a batch of payloads after their metadata rows are gone.
    ///
    /// Metadata is deleted before the blobs so a partial failure leaves
    /// orphaned garbage rather than dangling references. Every key that
    /// fails to delete is reported through the audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] naming the failure count when any
    /// delete failed.
    pub async fn purge_blobs(&self, keys: &[BlobKey]) -> Result<(), ApiError> {
        let mut failed = 0usize;
        for key in keys {
            if let Err(err) = self.blobs.delete(key).await {
                failed += 1;
                self.audit
                    .record(&AuditEvent::orphaned_blob(key.as_str(), &err.to_string()));
            }
        }
        if failed > 0 {
            return Err(ApiError::storage(format!(
                "failed to delete {failed} of {} submission payloads",
                keys.len()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Generates a unique blob key scoped under the assignment and student.
fn generate_blob_key(assignment_id: AssignmentId, student_id: UserId) -> BlobKey {
    let mut random = [0u8; BLOB_KEY_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut random);
    BlobKey::new(format!(
        "submissions/{assignment_id}/{student_id}/{}",
        hex_encode(&random)
    ))
}

/// Lowercase hex encoding of a byte slice.
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Current wall-clock time in unix milliseconds.
fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
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

    #[test]
    fn blob_keys_are_scoped_and_unique() {
        let a = generate_blob_key(AssignmentId::new(7), UserId::new(3));
        let b = generate_blob_key(AssignmentId::new(7), UserId::new(3));
        assert!(a.as_str().starts_with("submissions/7/3/"));
        assert_ne!(a, b);
    }

    #[test]
    fn hex_encoding_is_lowercase_and_padded() {
        assert_eq!(hex_encode(&[0x00, 0x0f, 0xab]), "000fab");
    }
}
