use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::reports::ReportData;

/// GET /api/admin/reports - aggregate rollups for the dashboard charts
pub async fn get(State(state): State<AppState>) -> ApiResult<ReportData> {
    let report = state.reports.reports().await?;
    Ok(ApiResponse::success(report))
}
