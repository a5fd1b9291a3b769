use axum::extract::{Query, State};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::ActivityLogEntry;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// GET /api/admin/activity?limit=N - newest-first admin action feed
pub async fn feed(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Vec<ActivityLogEntry>> {
    let entries = state.activity.recent(query.limit).await?;
    Ok(ApiResponse::success(entries))
}
