use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Account, ActivityLogEntry, Course, CourseStatus, Role};

pub mod memory;
pub mod postgres;

pub use memory::MemoryDirectoryStore;
pub use postgres::PgDirectoryStore;

/// Errors from a directory store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email already in use by another account")]
    DuplicateEmail,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Optional filters for the student listing.
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub grade: Option<String>,
    /// Case-insensitive substring match over name or email.
    pub search: Option<String>,
}

/// Optional filters for the course listing.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub status: Option<CourseStatus>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub teacher: Option<Uuid>,
}

/// Persistence port for the account and course directories.
///
/// Single-document reads and writes are plain CRUD. The multi-document
/// operations (`reassign_course`, `enroll`, `unenroll`, the cascading
/// deletes) are each one atomic unit in the backend; the service layer
/// sequences them but never has to repair a half-applied one.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    // -- accounts ---------------------------------------------------------

    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    /// True when `email` belongs to an account other than `exclude`.
    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, StoreError>;
    async fn list_teachers(&self) -> Result<Vec<Account>, StoreError>;
    /// Students matching `filter`, sorted by name ascending.
    async fn list_students(&self, filter: &StudentFilter) -> Result<Vec<Account>, StoreError>;
    /// Accounts matching `ids`, sorted by name ascending; unknown ids are
    /// silently skipped.
    async fn accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, StoreError>;
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;
    /// Rewrite every mutable field of the account row (`role` is immutable).
    /// Returns false when the id does not exist.
    async fn update_account(&self, account: &Account) -> Result<bool, StoreError>;
    async fn count_accounts(&self, role: Role) -> Result<i64, StoreError>;
    /// Sum of all students' enrollment list sizes.
    async fn enrollment_total(&self) -> Result<i64, StoreError>;
    async fn student_exists(&self, id: Uuid) -> Result<bool, StoreError>;

    // -- courses ----------------------------------------------------------

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError>;
    async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, StoreError>;
    async fn courses_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Course>, StoreError>;
    async fn insert_course(&self, course: &Course) -> Result<(), StoreError>;
    async fn update_course(&self, course: &Course) -> Result<bool, StoreError>;
    async fn count_courses(&self) -> Result<i64, StoreError>;
    async fn course_exists(&self, id: Uuid) -> Result<bool, StoreError>;

    // -- paired reference writes ------------------------------------------

    /// Point `course_id` at teacher `to` (or no teacher), pulling it from
    /// `from`'s course list and adding it to `to`'s (set semantics).
    async fn reassign_course(
        &self,
        course_id: Uuid,
        from: Option<Uuid>,
        to: Option<Uuid>,
    ) -> Result<(), StoreError>;

    /// Add `course_id` to the teacher's course list (set semantics).
    async fn add_course_to_teacher(
        &self,
        teacher_id: Uuid,
        course_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Link both sides of the enrollment (set semantics).
    async fn enroll(&self, student_id: Uuid, course_id: Uuid) -> Result<(), StoreError>;

    /// Unlink both sides of the enrollment.
    async fn unenroll(&self, student_id: Uuid, course_id: Uuid) -> Result<(), StoreError>;

    /// One-sided repair: add the course to the student's enrollment list.
    async fn add_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<(), StoreError>;

    /// One-sided repair: add the student to the course roster.
    async fn add_roster_entry(&self, course_id: Uuid, student_id: Uuid) -> Result<(), StoreError>;

    // -- cascading deletes ------------------------------------------------

    /// Delete the course; pull its id from the former teacher's course list
    /// and from every enrolled student's enrollment list. Returns the
    /// deleted course.
    async fn delete_course(&self, course_id: Uuid) -> Result<Option<Course>, StoreError>;

    /// Delete the student (role-scoped); pull their id from every enrolled
    /// course's roster. Returns the deleted account.
    async fn delete_student(&self, student_id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Delete the teacher row only (role-scoped). Callers must have checked
    /// that the teacher owns no courses.
    async fn delete_teacher(&self, teacher_id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Set `teacher = NULL` on every course referencing the teacher, then
    /// delete the teacher. Returns the deleted account and the number of
    /// courses orphaned.
    async fn delete_teacher_orphan(
        &self,
        teacher_id: Uuid,
    ) -> Result<Option<(Account, u64)>, StoreError>;

    /// Delete the courses in `course_ids` that belong to the teacher
    /// (foreign ids are silently ignored), then delete the teacher. Returns
    /// the deleted account and the number of courses actually deleted.
    async fn delete_teacher_with_courses(
        &self,
        teacher_id: Uuid,
        course_ids: &[Uuid],
    ) -> Result<Option<(Account, u64)>, StoreError>;

    // -- activity log -----------------------------------------------------

    async fn append_activity(&self, entry: &ActivityLogEntry) -> Result<(), StoreError>;
    async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityLogEntry>, StoreError>;
}
