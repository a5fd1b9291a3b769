use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Closed set of admin action tags. Feed consumers key off the serialized
/// form, so the wire names are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    TeacherAdded,
    TeacherUpdated,
    TeacherRemoved,
    TeacherRemovedWithCourses,
    TeacherRemovedKeepCourses,
    CourseAdded,
    CourseUpdated,
    CourseApproved,
    CourseRejected,
    CourseAssignedTeacher,
    CourseRemoved,
    StudentAdded,
    StudentUpdated,
    StudentRemoved,
    StudentEnrolled,
    StudentUnenrolled,
    AdminSettingsUpdated,
}

/// What kind of record an activity entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    User,
    Course,
    System,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::User => "User",
            TargetType::Course => "Course",
            TargetType::System => "System",
        }
    }
}

/// Immutable audit record of one admin action. Written once, never updated
/// or deleted; read only for the newest-first activity feed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub action: ActivityAction,
    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,
    pub target_name: Option<String>,
    pub detail: Option<Value>,
    pub created_at: DateTime<Utc>,
}
