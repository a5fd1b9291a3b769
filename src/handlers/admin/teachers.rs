use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Account;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::accounts::{AccountPatch, NewTeacher, TeacherDetail};
use crate::services::Actor;

use super::parse_id;

#[derive(Debug, Deserialize)]
pub struct CreateTeacherBody {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTeacherBody {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignCourseBody {
    pub course_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveWithCoursesBody {
    pub courses_to_delete: Option<Vec<String>>,
}

/// GET /api/admin/teachers
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Account>> {
    let teachers = state.accounts.list_teachers().await?;
    Ok(ApiResponse::success(teachers))
}

/// GET /api/admin/teachers/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TeacherDetail> {
    let id = parse_id(&id, "Invalid teacher ID")?;
    let teacher = state.accounts.get_teacher(id).await?;
    Ok(ApiResponse::success(teacher))
}

/// POST /api/admin/teachers
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateTeacherBody>,
) -> ApiResult<Value> {
    let actor = Actor::from(&user);
    let teacher = state
        .accounts
        .create_teacher(
            &actor,
            NewTeacher {
                name: body.name,
                email: body.email,
            },
        )
        .await?;
    Ok(ApiResponse::created(json!({
        "message": "Teacher created",
        "teacher": teacher
    })))
}

/// PUT /api/admin/teachers/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateTeacherBody>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invalid teacher ID")?;
    let actor = Actor::from(&user);
    let teacher = state
        .accounts
        .update_teacher(
            &actor,
            id,
            AccountPatch {
                name: body.name,
                email: body.email,
                grade: None,
            },
        )
        .await?;
    Ok(ApiResponse::success(json!({
        "message": "Teacher updated",
        "teacher": teacher
    })))
}

/// DELETE /api/admin/teachers/:id
///
/// Simple removal; refused with the blocking course list when the teacher
/// still owns courses.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invalid teacher ID")?;
    let actor = Actor::from(&user);
    state.registrar.remove_teacher(&actor, id).await?;
    Ok(ApiResponse::success(json!({
        "message": "Teacher removed successfully"
    })))
}

/// DELETE /api/admin/teachers/:id/delete-with-courses
pub async fn remove_with_courses(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RemoveWithCoursesBody>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invalid teacher ID")?;
    let raw_ids = body.courses_to_delete.ok_or_else(|| {
        crate::error::ApiError::bad_request("coursesToDelete must be an array of course IDs")
    })?;
    let mut course_ids = Vec::with_capacity(raw_ids.len());
    for raw in &raw_ids {
        course_ids.push(parse_id(raw, "Invalid course ID in coursesToDelete")?);
    }

    let actor = Actor::from(&user);
    let outcome = state
        .registrar
        .remove_teacher_with_courses(&actor, id, course_ids)
        .await?;
    Ok(ApiResponse::success(json!({
        "message": format!(
            "Teacher and {} associated course(s) removed",
            outcome.affected_courses
        )
    })))
}

/// DELETE /api/admin/teachers/:id/orphan-courses
pub async fn remove_orphan_courses(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invalid teacher ID")?;
    let actor = Actor::from(&user);
    state
        .registrar
        .remove_teacher_orphan_courses(&actor, id)
        .await?;
    Ok(ApiResponse::success(json!({
        "message": "Teacher removed successfully, associated courses are now unassigned."
    })))
}

/// PUT /api/admin/teachers/:id/assign-course
pub async fn assign_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<AssignCourseBody>,
) -> ApiResult<Value> {
    let teacher_id = parse_id(&id, "Invalid teacher ID")?;
    let course_id = parse_id(&body.course_id, "Invalid course ID")?;

    let actor = Actor::from(&user);
    let teacher = state
        .registrar
        .assign_course(&actor, teacher_id, course_id)
        .await?;
    Ok(ApiResponse::success(json!({
        "message": "Course assigned to teacher",
        "teacher": teacher
    })))
}
