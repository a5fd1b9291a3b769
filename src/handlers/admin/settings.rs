use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Account;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::accounts::AccountPatch;
use crate::services::Actor;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsBody {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// GET /api/admin/settings - the calling admin's own account
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Account> {
    let admin = state.accounts.get_settings(user.id).await?;
    Ok(ApiResponse::success(admin))
}

/// PUT /api/admin/settings
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateSettingsBody>,
) -> ApiResult<Value> {
    let actor = Actor::from(&user);
    let admin = state
        .accounts
        .update_settings(
            &actor,
            user.id,
            AccountPatch {
                name: body.name,
                email: body.email,
                grade: None,
            },
        )
        .await?;
    Ok(ApiResponse::success(json!({
        "message": "Admin settings updated",
        "admin": admin
    })))
}
