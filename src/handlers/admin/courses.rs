use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Course, CourseStatus};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::courses::{CourseDetail, CoursePatch, CourseView, NewCourse};
use crate::services::Actor;
use crate::store::CourseFilter;

use super::{double_option, parse_id};

#[derive(Debug, Default, Deserialize)]
pub struct CourseListQuery {
    pub status: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub teacher: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseBody {
    pub name: String,
    pub description: Option<String>,
    pub teacher: String,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub syllabus: Option<String>,
    pub resources: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCourseBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub syllabus: Option<String>,
    pub resources: Option<String>,
    /// Absent = keep; null = unassign; id = reassign.
    #[serde(default, deserialize_with = "double_option")]
    pub teacher: Option<Option<String>>,
}

/// GET /api/admin/courses
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> ApiResult<Vec<CourseView>> {
    let teacher = match &query.teacher {
        Some(raw) => Some(parse_id(raw, "Invalid teacher ID for filtering")?),
        None => None,
    };
    let status = match &query.status {
        Some(raw) => Some(
            raw.parse::<CourseStatus>()
                .map_err(|_| crate::error::ApiError::bad_request("Invalid status filter"))?,
        ),
        None => None,
    };
    let filter = CourseFilter {
        status,
        subject: query.subject,
        grade: query.grade,
        teacher,
    };
    let courses = state.courses.list(&filter).await?;
    Ok(ApiResponse::success(courses))
}

/// GET /api/admin/courses/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CourseDetail> {
    let id = parse_id(&id, "Invalid course ID")?;
    let course = state.courses.get(id).await?;
    Ok(ApiResponse::success(course))
}

/// POST /api/admin/courses
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateCourseBody>,
) -> ApiResult<Value> {
    let teacher = parse_id(&body.teacher, "Invalid teacher ID")?;
    let actor = Actor::from(&user);
    let course = state
        .courses
        .create(
            &actor,
            NewCourse {
                name: body.name,
                description: body.description,
                teacher,
                subject: body.subject,
                grade: body.grade,
                syllabus: body.syllabus,
                resources: body.resources,
            },
        )
        .await?;
    Ok(ApiResponse::created(json!({
        "message": "Course created",
        "course": course
    })))
}

/// PUT /api/admin/courses/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateCourseBody>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invalid course ID")?;
    let teacher = match body.teacher {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => Some(Some(parse_id(
            &raw,
            "Invalid Teacher ID provided for update",
        )?)),
    };

    let actor = Actor::from(&user);
    let course = state
        .courses
        .update(
            &actor,
            id,
            CoursePatch {
                name: body.name,
                description: body.description,
                subject: body.subject,
                grade: body.grade,
                syllabus: body.syllabus,
                resources: body.resources,
                teacher,
            },
        )
        .await?;
    Ok(ApiResponse::success(json!({
        "message": "Course updated",
        "course": course
    })))
}

/// PUT /api/admin/courses/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invalid course ID")?;
    let actor = Actor::from(&user);
    let course: Course = state.courses.approve(&actor, id).await?;
    Ok(ApiResponse::success(json!({
        "message": "Course approved",
        "course": course
    })))
}

/// PUT /api/admin/courses/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invalid course ID")?;
    let actor = Actor::from(&user);
    let course: Course = state.courses.reject(&actor, id).await?;
    Ok(ApiResponse::success(json!({
        "message": "Course rejected",
        "course": course
    })))
}

/// DELETE /api/admin/courses/:id
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "Invalid course ID")?;
    let actor = Actor::from(&user);
    state.registrar.remove_course(&actor, id).await?;
    Ok(ApiResponse::success(json!({
        "message": "Course deleted successfully"
    })))
}
