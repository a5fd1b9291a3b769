use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::accounts::{AccountPatch, NewStudent};
use crate::services::Actor;
use crate::store::StudentFilter;

use super::parse_id;

#[derive(Debug, Default, Deserialize)]
pub struct StudentListQuery {
    pub grade: Option<String>,
    pub search: Option<String>,
    /// `populate=enrollments` attaches course summaries to each student.
    pub populate: Option<String>,
}

impl StudentListQuery {
    fn filter(&self) -> StudentFilter {
        StudentFilter {
            grade: self.grade.clone(),
            search: self.search.clone(),
        }
    }

    fn wants_enrollments(&self) -> bool {
        self.populate.as_deref() == Some("enrollments")
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentBody {
    pub name: String,
    pub email: String,
    pub grade: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStudentBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub grade: Option<String>,
}

/// GET /api/admin/students
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<StudentListQuery>,
) -> Result<Response, ApiError> {
    let filter = query.filter();
    if query.wants_enrollments() {
        let students = state.accounts.list_students_populated(&filter).await?;
        Ok(ApiResponse::success(students).into_response())
    } else {
        let students = state.accounts.list_students(&filter).await?;
        Ok(ApiResponse::success(students).into_response())
    }
}

/// GET /api/admin/students/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StudentListQuery>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "Invalid student ID")?;
    if query.wants_enrollments() {
        let student = state.accounts.get_student_populated(id).await?;
        Ok(ApiResponse::success(student).into_response())
    } else {
        let student = state.accounts.get_student(id).await?;
        Ok(ApiResponse::success(student).into_response())
    }
}

/// POST /api/admin/students
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateStudentBody>,
) -> ApiResult<serde_json::Value> {
    let actor = Actor::from(&user);
    let student = state
        .accounts
        .create_student(
            &actor,
            NewStudent {
                name: body.name,
                email: body.email,
                grade: body.grade.unwrap_or_default(),
            },
        )
        .await?;
    Ok(ApiResponse::created(json!({
        "message": "Student created",
        "student": student
    })))
}

/// PUT /api/admin/students/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateStudentBody>,
) -> ApiResult<serde_json::Value> {
    let id = parse_id(&id, "Invalid student ID")?;
    let actor = Actor::from(&user);
    let student = state
        .accounts
        .update_student(
            &actor,
            id,
            AccountPatch {
                name: body.name,
                email: body.email,
                grade: body.grade,
            },
        )
        .await?;
    Ok(ApiResponse::success(json!({
        "message": "Student updated",
        "student": student
    })))
}

/// DELETE /api/admin/students/:id
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<serde_json::Value> {
    let id = parse_id(&id, "Invalid student ID")?;
    let actor = Actor::from(&user);
    state.registrar.remove_student(&actor, id).await?;
    Ok(ApiResponse::success(json!({
        "message": "Student removed successfully"
    })))
}

/// POST /api/admin/students/:id/enroll/:course_id
pub async fn enroll(
    State(state): State<AppState>,
    Path((student_id, course_id)): Path<(String, String)>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<serde_json::Value> {
    let (student_id, course_id) = parse_pair(&student_id, &course_id)?;
    let actor = Actor::from(&user);
    state.registrar.enroll(&actor, student_id, course_id).await?;
    Ok(ApiResponse::success(json!({
        "message": "Student enrolled successfully"
    })))
}

/// DELETE /api/admin/students/:id/unenroll/:course_id
pub async fn unenroll(
    State(state): State<AppState>,
    Path((student_id, course_id)): Path<(String, String)>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<serde_json::Value> {
    let (student_id, course_id) = parse_pair(&student_id, &course_id)?;
    let actor = Actor::from(&user);
    state
        .registrar
        .unenroll(&actor, student_id, course_id)
        .await?;
    Ok(ApiResponse::success(json!({
        "message": "Student unenrolled successfully"
    })))
}

fn parse_pair(student_id: &str, course_id: &str) -> Result<(uuid::Uuid, uuid::Uuid), ApiError> {
    let student = parse_id(student_id, "Invalid Student or Course ID")?;
    let course = parse_id(course_id, "Invalid Student or Course ID")?;
    Ok((student, course))
}
