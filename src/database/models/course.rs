use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Course approval status. Only approved courses accept new enrollments.
/// Transitions are unrestricted: approve/reject overwrite whatever state the
/// course is in (admin override).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "course_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Pending,
    Approved,
    Rejected,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Pending => "pending",
            CourseStatus::Approved => "approved",
            CourseStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CourseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CourseStatus::Pending),
            "approved" => Ok(CourseStatus::Approved),
            "rejected" => Ok(CourseStatus::Rejected),
            other => Err(format!("unknown course status: {}", other)),
        }
    }
}

/// An offered course. `teacher` is the owning teacher account (or None once
/// orphaned); `students` mirrors the enrolled students' `enrollments` lists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub syllabus: Option<String>,
    pub resources: Option<String>,
    pub status: CourseStatus,
    pub teacher: Option<Uuid>,
    pub students: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// New course in the initial `pending` state, owned by `teacher`.
    pub fn new(name: impl Into<String>, teacher: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            subject: None,
            grade: None,
            syllabus: None,
            resources: None,
            status: CourseStatus::Pending,
            teacher: Some(teacher),
            students: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
