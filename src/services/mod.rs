use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::store::StoreError;

pub mod accounts;
pub mod activity;
pub mod courses;
pub mod registrar;
pub mod reports;

pub use accounts::AccountService;
pub use activity::ActivityLog;
pub use courses::CourseService;
pub use registrar::RegistrarService;
pub use reports::ReportService;

/// Minimal course reference returned when a deletion is blocked.
#[derive(Debug, Clone, Serialize)]
pub struct CourseRef {
    pub id: Uuid,
    pub name: String,
}

/// The admin performing an operation, for audit attribution.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
}

impl From<&AuthUser> for Actor {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// Errors surfaced by the directory services. Translated to HTTP at the
/// handler boundary via `ApiError`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    /// Per-field violations as `(field, message)` pairs; displayed joined,
    /// like the original's validator output.
    #[error("{}", join_violations(.0))]
    Validation(Vec<(String, String)>),

    #[error("{0}")]
    Conflict(String),

    /// Simple teacher removal refused: the caller gets the blocking courses
    /// so it can pick a removal variant.
    #[error("Teacher has assigned courses")]
    TeacherHasCourses(Vec<CourseRef>),

    #[error("{0}")]
    InvalidReference(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

fn join_violations(violations: &[(String, String)]) -> String {
    violations
        .iter()
        .map(|(_, message)| message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
