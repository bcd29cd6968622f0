// crates/coursebook-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Coursebook Store
// Description: Durable entity store backed by SQLite WAL.
// Purpose: Persist users, courses, enrollments, assignments, and submission
//          metadata with paginated, filter-aware reads.
// Dependencies: coursebook-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements the relational store on a single `SQLite` database.
//! Referential integrity is enforced in-engine: enrollments, assignments, and
//! submission metadata cascade when their parent rows are deleted. Submission
//! payload bytes are never stored here; rows carry the object-store key that
//! correlates metadata with its blob. All connection access is serialized
//! through a mutex.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use coursebook_core::ApiError;
use coursebook_core::Assignment;
use coursebook_core::AssignmentId;
use coursebook_core::AssignmentPatch;
use coursebook_core::BlobKey;
use coursebook_core::Course;
use coursebook_core::CourseFilter;
use coursebook_core::CourseId;
use coursebook_core::CoursePatch;
use coursebook_core::EnrollmentResult;
use coursebook_core::EnrollmentUpdate;
use coursebook_core::NewAssignment;
use coursebook_core::NewCourse;
use coursebook_core::NewSubmission;
use coursebook_core::Page;
use coursebook_core::PageBounds;
use coursebook_core::PageRequest;
use coursebook_core::Role;
use coursebook_core::Submission;
use coursebook_core::SubmissionFilter;
use coursebook_core::SubmissionId;
use coursebook_core::User;
use coursebook_core::UserId;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` Coursebook store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding credential material.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or request payload.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Uniqueness violation.
    #[error("sqlite store duplicate: {0}")]
    Duplicate(String),
    /// Referenced row does not exist.
    #[error("sqlite store missing row: {0}")]
    Missing(String),
}

impl From<SqliteStoreError> for ApiError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message)
            | SqliteStoreError::Db(message)
            | SqliteStoreError::VersionMismatch(message) => Self::Storage(message),
            SqliteStoreError::Invalid(message) => Self::Validation(message),
            SqliteStoreError::Duplicate(message) => Self::Conflict(message),
            SqliteStoreError::Missing(message) => Self::NotFound(message),
        }
    }
}

/// Maps a `rusqlite` error to a store error.
fn map_db_err(err: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

/// Returns true when the error is a uniqueness constraint violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
    )
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed Coursebook store with WAL support.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex.
/// - Cascading deletes cover enrollments, assignments, and submission rows;
///   object-store payload cleanup is the caller's responsibility.
#[derive(Clone)]
pub struct SqliteStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens an `SQLite`-backed Coursebook store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Inserts a user row with an already-hashed password.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Duplicate`] when the email is taken.
    pub fn insert_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
                params![name, email, password_hash, role.as_str()],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    SqliteStoreError::Duplicate(format!("email already registered: {email}"))
                } else {
                    map_db_err(&err)
                }
            })?;
        let id = UserId::new(guard.last_insert_rowid());
        Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
        })
    }

    /// Fetches a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn get_user(&self, id: UserId) -> Result<Option<User>, SqliteStoreError> {
        let guard = self.lock()?;
        let row: Option<(i64, String, String, String, String)> = guard
            .query_row(
                "SELECT id, name, email, password_hash, role FROM users WHERE id = ?1",
                params![id.get()],
                |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                },
            )
            .optional()
            .map_err(|err| map_db_err(&err))?;
        row.map(user_from_columns).transpose()
    }

    /// Fetches a user by login email.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, SqliteStoreError> {
        let guard = self.lock()?;
        let row: Option<(i64, String, String, String, String)> = guard
            .query_row(
                "SELECT id, name, email, password_hash, role FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                },
            )
            .optional()
            .map_err(|err| map_db_err(&err))?;
        row.map(user_from_columns).transpose()
    }

    /// Lists the ids of courses taught by an instructor, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn courses_taught_by(
        &self,
        instructor_id: UserId,
    ) -> Result<Vec<CourseId>, SqliteStoreError> {
        let guard = self.lock()?;
        collect_ids(
            &guard,
            "SELECT id FROM courses WHERE instructor_id = ?1 ORDER BY id ASC",
            instructor_id.get(),
        )
        .map(|ids| ids.into_iter().map(CourseId::new).collect())
    }

    /// Lists the ids of courses a student is enrolled in, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn courses_enrolled_in(
        &self,
        student_id: UserId,
    ) -> Result<Vec<CourseId>, SqliteStoreError> {
        let guard = self.lock()?;
        collect_ids(
            &guard,
            "SELECT course_id FROM enrollments WHERE student_id = ?1 ORDER BY course_id ASC",
            student_id.get(),
        )
        .map(|ids| ids.into_iter().map(CourseId::new).collect())
    }

    // ------------------------------------------------------------------
    // Courses
    // ------------------------------------------------------------------

    /// Inserts a course row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when `instructor_id` does not
    /// reference a user with the instructor role.
    pub fn insert_course(&self, course: &NewCourse) -> Result<Course, SqliteStoreError> {
        let guard = self.lock()?;
        require_instructor(&guard, course.instructor_id)?;
        guard
            .execute(
                "INSERT INTO courses (subject, number, title, term, instructor_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    course.subject,
                    course.number,
                    course.title,
                    course.term,
                    course.instructor_id.get()
                ],
            )
            .map_err(|err| map_db_err(&err))?;
        let id = CourseId::new(guard.last_insert_rowid());
        Ok(Course {
            id,
            subject: course.subject.clone(),
            number: course.number.clone(),
            title: course.title.clone(),
            term: course.term.clone(),
            instructor_id: course.instructor_id,
        })
    }

    /// Fetches a course by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn get_course(&self, id: CourseId) -> Result<Option<Course>, SqliteStoreError> {
        let guard = self.lock()?;
        fetch_course(&guard, id)
    }

    /// Lists courses matching the filter as one page, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn list_courses(
        &self,
        filter: &CourseFilter,
        request: PageRequest,
    ) -> Result<Page<Course>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut clauses: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(subject) = &filter.subject {
            clauses.push("subject = ?");
            values.push(Value::Text(subject.clone()));
        }
        if let Some(number) = &filter.number {
            clauses.push("number = ?");
            values.push(Value::Text(number.clone()));
        }
        if let Some(term) = &filter.term {
            clauses.push("term = ?");
            values.push(Value::Text(term.clone()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let total: i64 = guard
            .query_row(
                &format!("SELECT COUNT(*) FROM courses{where_sql}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .map_err(|err| map_db_err(&err))?;
        let bounds = PageBounds::compute(u64::try_from(total).unwrap_or(0), request);
        let mut page_values = values;
        page_values.push(Value::Integer(to_sql_int(bounds.page_size)));
        page_values.push(Value::Integer(to_sql_int(bounds.offset)));
        let mut statement = guard
            .prepare(&format!(
                "SELECT id, subject, number, title, term, instructor_id
                 FROM courses{where_sql} ORDER BY id ASC LIMIT ? OFFSET ?"
            ))
            .map_err(|err| map_db_err(&err))?;
        let rows = statement
            .query_map(params_from_iter(page_values.iter()), |row| {
                Ok(Course {
                    id: CourseId::new(row.get(0)?),
                    subject: row.get(1)?,
                    number: row.get(2)?,
                    title: row.get(3)?,
                    term: row.get(4)?,
                    instructor_id: UserId::new(row.get(5)?),
                })
            })
            .map_err(|err| map_db_err(&err))?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(|err| map_db_err(&err))?);
        }
        Ok(Page::new(items, bounds))
    }

    /// Applies a partial update to a course.
    ///
    /// Returns `None` when the course does not exist. An empty patch is
    /// rejected before reaching the store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when the patch re-homes the
    /// course to a non-instructor user.
    pub fn update_course(
        &self,
        id: CourseId,
        patch: &CoursePatch,
    ) -> Result<Option<Course>, SqliteStoreError> {
        let guard = self.lock()?;
        if fetch_course(&guard, id)?.is_none() {
            return Ok(None);
        }
        if let Some(instructor_id) = patch.instructor_id {
            require_instructor(&guard, instructor_id)?;
        }
        let mut assignments: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(subject) = &patch.subject {
            assignments.push("subject = ?");
            values.push(Value::Text(subject.clone()));
        }
        if let Some(number) = &patch.number {
            assignments.push("number = ?");
            values.push(Value::Text(number.clone()));
        }
        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(term) = &patch.term {
            assignments.push("term = ?");
            values.push(Value::Text(term.clone()));
        }
        if let Some(instructor_id) = patch.instructor_id {
            assignments.push("instructor_id = ?");
            values.push(Value::Integer(instructor_id.get()));
        }
        if assignments.is_empty() {
            return Err(SqliteStoreError::Invalid("empty course patch".to_string()));
        }
        values.push(Value::Integer(id.get()));
        guard
            .execute(
                &format!("UPDATE courses SET {} WHERE id = ?", assignments.join(", ")),
                params_from_iter(values.iter()),
            )
            .map_err(|err| map_db_err(&err))?;
        fetch_course(&guard, id)
    }

    /// Deletes a course row; enrollments, assignments, and submission rows
    /// cascade in-engine.
    ///
    /// Returns false when the course does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn delete_course(&self, id: CourseId) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let deleted = guard
            .execute("DELETE FROM courses WHERE id = ?1", params![id.get()])
            .map_err(|err| map_db_err(&err))?;
        Ok(deleted > 0)
    }

    /// Lists the object-store keys of every submission under a course.
    ///
    /// Callers collect these before deleting the course so payload cleanup
    /// can run after the relational cascade.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn blob_keys_for_course(&self, id: CourseId) -> Result<Vec<BlobKey>, SqliteStoreError> {
        let guard = self.lock()?;
        collect_blob_keys(
            &guard,
            "SELECT s.blob_key FROM submissions s
             JOIN assignments a ON a.id = s.assignment_id
             WHERE a.course_id = ?1 ORDER BY s.id ASC",
            id.get(),
        )
    }

    // ------------------------------------------------------------------
    // Enrollment ledger
    // ------------------------------------------------------------------

    /// Lists enrolled student ids for a course, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn list_student_ids(&self, course_id: CourseId) -> Result<Vec<UserId>, SqliteStoreError> {
        let guard = self.lock()?;
        collect_ids(
            &guard,
            "SELECT student_id FROM enrollments WHERE course_id = ?1 ORDER BY student_id ASC",
            course_id.get(),
        )
        .map(|ids| ids.into_iter().map(UserId::new).collect())
    }

    /// Lists enrolled student records for a course, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn list_students(&self, course_id: CourseId) -> Result<Vec<User>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT u.id, u.name, u.email, u.password_hash, u.role
                 FROM users u JOIN enrollments e ON e.student_id = u.id
                 WHERE e.course_id = ?1 ORDER BY u.id ASC",
            )
            .map_err(|err| map_db_err(&err))?;
        let rows = statement
            .query_map(params![course_id.get()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })
            .map_err(|err| map_db_err(&err))?;
        let mut students = Vec::new();
        for row in rows {
            students.push(user_from_columns(row.map_err(|err| map_db_err(&err))?)?);
        }
        Ok(students)
    }

    /// Returns true when the student is enrolled in the course.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn is_enrolled(
        &self,
        course_id: CourseId,
        student_id: UserId,
    ) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let found: Option<i64> = guard
            .query_row(
                "SELECT 1 FROM enrollments WHERE course_id = ?1 AND student_id = ?2",
                params![course_id.get(), student_id.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_db_err(&err))?;
        Ok(found.is_some())
    }

    /// Applies a roster change atomically: additions first, then removals.
    ///
    /// Additions referencing unknown users or non-students are silently
    /// skipped; the batch never fails on a bad id. Re-adding an enrolled
    /// student or removing an absent one is likewise a no-op. Only ids that
    /// actually changed state appear in the result.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn update_enrollment(
        &self,
        course_id: CourseId,
        update: &EnrollmentUpdate,
    ) -> Result<EnrollmentResult, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| map_db_err(&err))?;
        let mut result = EnrollmentResult::default();
        for student_id in &update.add {
            let role: Option<String> = tx
                .query_row(
                    "SELECT role FROM users WHERE id = ?1",
                    params![student_id.get()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| map_db_err(&err))?;
            if !matches!(role.as_deref().map(Role::parse), Some(Some(Role::Student))) {
                continue;
            }
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO enrollments (course_id, student_id) VALUES (?1, ?2)",
                    params![course_id.get(), student_id.get()],
                )
                .map_err(|err| map_db_err(&err))?;
            if inserted > 0 {
                result.added.push(*student_id);
            }
        }
        for student_id in &update.remove {
            let removed = tx
                .execute(
                    "DELETE FROM enrollments WHERE course_id = ?1 AND student_id = ?2",
                    params![course_id.get(), student_id.get()],
                )
                .map_err(|err| map_db_err(&err))?;
            if removed > 0 {
                result.removed.push(*student_id);
            }
        }
        tx.commit().map_err(|err| map_db_err(&err))?;
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------

    /// Inserts an assignment row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Missing`] when the owning course does not
    /// exist.
    pub fn insert_assignment(
        &self,
        assignment: &NewAssignment,
    ) -> Result<Assignment, SqliteStoreError> {
        let guard = self.lock()?;
        if fetch_course(&guard, assignment.course_id)?.is_none() {
            return Err(SqliteStoreError::Missing(format!(
                "course {}",
                assignment.course_id
            )));
        }
        guard
            .execute(
                "INSERT INTO assignments (course_id, title, points, due) VALUES (?1, ?2, ?3, ?4)",
                params![
                    assignment.course_id.get(),
                    assignment.title,
                    assignment.points,
                    assignment.due
                ],
            )
            .map_err(|err| map_db_err(&err))?;
        let id = AssignmentId::new(guard.last_insert_rowid());
        Ok(Assignment {
            id,
            course_id: assignment.course_id,
            title: assignment.title.clone(),
            points: assignment.points,
            due: assignment.due.clone(),
        })
    }

    /// Fetches an assignment by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn get_assignment(
        &self,
        id: AssignmentId,
    ) -> Result<Option<Assignment>, SqliteStoreError> {
        let guard = self.lock()?;
        fetch_assignment(&guard, id)
    }

    /// Lists the assignments of a course, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn list_assignments(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<Assignment>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT id, course_id, title, points, due FROM assignments
                 WHERE course_id = ?1 ORDER BY id ASC",
            )
            .map_err(|err| map_db_err(&err))?;
        let rows = statement
            .query_map(params![course_id.get()], assignment_from_row)
            .map_err(|err| map_db_err(&err))?;
        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(row.map_err(|err| map_db_err(&err))?);
        }
        Ok(assignments)
    }

    /// Applies a partial update to an assignment.
    ///
    /// Returns `None` when the assignment does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn update_assignment(
        &self,
        id: AssignmentId,
        patch: &AssignmentPatch,
    ) -> Result<Option<Assignment>, SqliteStoreError> {
        let guard = self.lock()?;
        if fetch_assignment(&guard, id)?.is_none() {
            return Ok(None);
        }
        let mut assignments: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(points) = patch.points {
            assignments.push("points = ?");
            values.push(Value::Integer(points));
        }
        if let Some(due) = &patch.due {
            assignments.push("due = ?");
            values.push(Value::Text(due.clone()));
        }
        if assignments.is_empty() {
            return Err(SqliteStoreError::Invalid("empty assignment patch".to_string()));
        }
        values.push(Value::Integer(id.get()));
        guard
            .execute(
                &format!("UPDATE assignments SET {} WHERE id = ?", assignments.join(", ")),
                params_from_iter(values.iter()),
            )
            .map_err(|err| map_db_err(&err))?;
        fetch_assignment(&guard, id)
    }

    /// Deletes an assignment row; submission rows cascade in-engine.
    ///
    /// Returns false when the assignment does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn delete_assignment(&self, id: AssignmentId) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let deleted = guard
            .execute("DELETE FROM assignments WHERE id = ?1", params![id.get()])
            .map_err(|err| map_db_err(&err))?;
        Ok(deleted > 0)
    }

    /// Lists the object-store keys of every submission under an assignment.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn blob_keys_for_assignment(
        &self,
        id: AssignmentId,
    ) -> Result<Vec<BlobKey>, SqliteStoreError> {
        let guard = self.lock()?;
        collect_blob_keys(
            &guard,
            "SELECT blob_key FROM submissions WHERE assignment_id = ?1 ORDER BY id ASC",
            id.get(),
        )
    }

    // ------------------------------------------------------------------
    // Submissions
    // ------------------------------------------------------------------

    /// Inserts a submission metadata row after its blob write succeeded.
    ///
    /// The named student must hold the student role and be enrolled in the
    /// course owning the assignment; a submission is never attributed to
    /// anyone outside the roster.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Missing`] when the owning assignment or
    /// student does not exist, and [`SqliteStoreError::Invalid`] when the
    /// named user is not a student enrolled in the owning course.
    pub fn insert_submission(
        &self,
        submission: &NewSubmission,
    ) -> Result<Submission, SqliteStoreError> {
        let guard = self.lock()?;
        let Some(assignment) = fetch_assignment(&guard, submission.assignment_id)? else {
            return Err(SqliteStoreError::Missing(format!(
                "assignment {}",
                submission.assignment_id
            )));
        };
        let role: Option<String> = guard
            .query_row(
                "SELECT role FROM users WHERE id = ?1",
                params![submission.student_id.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_db_err(&err))?;
        let Some(role) = role else {
            return Err(SqliteStoreError::Missing(format!("user {}", submission.student_id)));
        };
        if Role::parse(&role) != Some(Role::Student) {
            return Err(SqliteStoreError::Invalid(format!(
                "user {} is not a student",
                submission.student_id
            )));
        }
        let enrolled: Option<i64> = guard
            .query_row(
                "SELECT 1 FROM enrollments WHERE course_id = ?1 AND student_id = ?2",
                params![assignment.course_id.get(), submission.student_id.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_db_err(&err))?;
        if enrolled.is_none() {
            return Err(SqliteStoreError::Invalid(format!(
                "student {} is not enrolled in course {}",
                submission.student_id, assignment.course_id
            )));
        }
        guard
            .execute(
                "INSERT INTO submissions
                 (assignment_id, student_id, timestamp, blob_key, filename, content_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    submission.assignment_id.get(),
                    submission.student_id.get(),
                    submission.timestamp,
                    submission.blob_key.as_str(),
                    submission.filename,
                    submission.content_type
                ],
            )
            .map_err(|err| map_db_err(&err))?;
        let id = SubmissionId::new(guard.last_insert_rowid());
        Ok(Submission {
            id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            timestamp: submission.timestamp,
            blob_key: submission.blob_key.clone(),
            filename: submission.filename.clone(),
            content_type: submission.content_type.clone(),
        })
    }

    /// Fetches a submission metadata row by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn get_submission(
        &self,
        id: SubmissionId,
    ) -> Result<Option<Submission>, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, assignment_id, student_id, timestamp, blob_key, filename, content_type
                 FROM submissions WHERE id = ?1",
                params![id.get()],
                submission_from_row,
            )
            .optional()
            .map_err(|err| map_db_err(&err))
    }

    /// Lists submissions under an assignment as one page, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on database failure.
    pub fn list_submissions(
        &self,
        assignment_id: AssignmentId,
        filter: SubmissionFilter,
        request: PageRequest,
    ) -> Result<Page<Submission>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut where_sql = "WHERE assignment_id = ?".to_string();
        let mut values: Vec<Value> = vec![Value::Integer(assignment_id.get())];
        if let Some(student_id) = filter.student_id {
            where_sql.push_str(" AND student_id = ?");
            values.push(Value::Integer(student_id.get()));
        }
        let total: i64 = guard
            .query_row(
                &format!("SELECT COUNT(*) FROM submissions {where_sql}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .map_err(|err| map_db_err(&err))?;
        let bounds = PageBounds::compute(u64::try_from(total).unwrap_or(0), request);
        let mut page_values = values;
        page_values.push(Value::Integer(to_sql_int(bounds.page_size)));
        page_values.push(Value::Integer(to_sql_int(bounds.offset)));
        let mut statement = guard
            .prepare(&format!(
                "SELECT id, assignment_id, student_id, timestamp, blob_key, filename, content_type
                 FROM submissions {where_sql} ORDER BY id ASC LIMIT ? OFFSET ?"
            ))
            .map_err(|err| map_db_err(&err))?;
        let rows = statement
            .query_map(params_from_iter(page_values.iter()), submission_from_row)
            .map_err(|err| map_db_err(&err))?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(|err| map_db_err(&err))?);
        }
        Ok(Page::new(items, bounds))
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Converts raw user columns into a typed record.
fn user_from_columns(
    (id, name, email, password_hash, role): (i64, String, String, String, String),
) -> Result<User, SqliteStoreError> {
    let role = Role::parse(&role)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unknown role label: {role}")))?;
    Ok(User {
        id: UserId::new(id),
        name,
        email,
        password_hash,
        role,
    })
}

/// Maps an assignment row in column order.
fn assignment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: AssignmentId::new(row.get(0)?),
        course_id: CourseId::new(row.get(1)?),
        title: row.get(2)?,
        points: row.get(3)?,
        due: row.get(4)?,
    })
}

/// Maps a submission row in column order.
fn submission_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Submission> {
    Ok(Submission {
        id: SubmissionId::new(row.get(0)?),
        assignment_id: AssignmentId::new(row.get(1)?),
        student_id: UserId::new(row.get(2)?),
        timestamp: row.get(3)?,
        blob_key: BlobKey::new(row.get::<_, String>(4)?),
        filename: row.get(5)?,
        content_type: row.get(6)?,
    })
}

// ============================================================================
// SECTION: Query Helpers
// ============================================================================

/// Fetches a course row inside an existing lock.
fn fetch_course(
    connection: &Connection,
    id: CourseId,
) -> Result<Option<Course>, SqliteStoreError> {
    connection
        .query_row(
            "SELECT id, subject, number, title, term, instructor_id
             FROM courses WHERE id = ?1",
            params![id.get()],
            |row| {
                Ok(Course {
                    id: CourseId::new(row.get(0)?),
                    subject: row.get(1)?,
                    number: row.get(2)?,
                    title: row.get(3)?,
                    term: row.get(4)?,
                    instructor_id: UserId::new(row.get(5)?),
                })
            },
        )
        .optional()
        .map_err(|err| map_db_err(&err))
}

/// Fetches an assignment row inside an existing lock.
fn fetch_assignment(
    connection: &Connection,
    id: AssignmentId,
) -> Result<Option<Assignment>, SqliteStoreError> {
    connection
        .query_row(
            "SELECT id, course_id, title, points, due FROM assignments WHERE id = ?1",
            params![id.get()],
            assignment_from_row,
        )
        .optional()
        .map_err(|err| map_db_err(&err))
}

/// Verifies a user exists and carries the instructor role.
fn require_instructor(connection: &Connection, id: UserId) -> Result<(), SqliteStoreError> {
    let role: Option<String> = connection
        .query_row("SELECT role FROM users WHERE id = ?1", params![id.get()], |row| row.get(0))
        .optional()
        .map_err(|err| map_db_err(&err))?;
    match role.as_deref().map(Role::parse) {
        Some(Some(Role::Instructor)) => Ok(()),
        Some(_) => Err(SqliteStoreError::Invalid(format!(
            "instructor_id {id} does not reference an instructor"
        ))),
        None => Err(SqliteStoreError::Missing(format!("user {id}"))),
    }
}

/// Collects a single-column list of integer ids for one bound parameter.
fn collect_ids(
    connection: &Connection,
    sql: &str,
    bound: i64,
) -> Result<Vec<i64>, SqliteStoreError> {
    let mut statement = connection.prepare(sql).map_err(|err| map_db_err(&err))?;
    let rows = statement
        .query_map(params![bound], |row| row.get(0))
        .map_err(|err| map_db_err(&err))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row.map_err(|err| map_db_err(&err))?);
    }
    Ok(ids)
}

/// Collects a single-column list of blob keys for one bound parameter.
fn collect_blob_keys(
    connection: &Connection,
    sql: &str,
    bound: i64,
) -> Result<Vec<BlobKey>, SqliteStoreError> {
    let mut statement = connection.prepare(sql).map_err(|err| map_db_err(&err))?;
    let rows = statement
        .query_map(params![bound], |row| row.get::<_, String>(0))
        .map_err(|err| map_db_err(&err))?;
    let mut keys = Vec::new();
    for row in rows {
        keys.push(BlobKey::new(row.map_err(|err| map_db_err(&err))?));
    }
    Ok(keys)
}

/// Clamps an unsigned bound into the `SQLite` integer domain.
fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Validates the configured store path shape.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Creates the parent directory for the database file when missing.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| map_db_err(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability and integrity.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| map_db_err(&err))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| map_db_err(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| map_db_err(&err))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| map_db_err(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| map_db_err(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| map_db_err(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| map_db_err(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| map_db_err(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    role TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS courses (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    subject TEXT NOT NULL,
                    number TEXT NOT NULL,
                    title TEXT NOT NULL,
                    term TEXT NOT NULL,
                    instructor_id INTEGER NOT NULL REFERENCES users(id)
                );
                CREATE INDEX IF NOT EXISTS idx_courses_filter
                    ON courses (subject, number, term);
                CREATE TABLE IF NOT EXISTS enrollments (
                    course_id INTEGER NOT NULL
                        REFERENCES courses(id) ON DELETE CASCADE,
                    student_id INTEGER NOT NULL
                        REFERENCES users(id) ON DELETE CASCADE,
                    PRIMARY KEY (course_id, student_id)
                );
                CREATE INDEX IF NOT EXISTS idx_enrollments_student
                    ON enrollments (student_id);
                CREATE TABLE IF NOT EXISTS assignments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    course_id INTEGER NOT NULL
                        REFERENCES courses(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    points INTEGER NOT NULL,
                    due TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_assignments_course
                    ON assignments (course_id);
                CREATE TABLE IF NOT EXISTS submissions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    assignment_id INTEGER NOT NULL
                        REFERENCES assignments(id) ON DELETE CASCADE,
                    student_id INTEGER NOT NULL REFERENCES users(id),
                    timestamp INTEGER NOT NULL,
                    blob_key TEXT NOT NULL UNIQUE,
                    filename TEXT NOT NULL,
                    content_type TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_submissions_assignment
                    ON submissions (assignment_id, student_id);",
            )
            .map_err(|err| map_db_err(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| map_db_err(&err))?;
    Ok(())
}
