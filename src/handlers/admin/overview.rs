use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::reports::Overview;

/// GET /api/admin/overview - headline dashboard counts
pub async fn get(State(state): State<AppState>) -> ApiResult<Overview> {
    let overview = state.reports.overview().await?;
    Ok(ApiResponse::success(overview))
}
