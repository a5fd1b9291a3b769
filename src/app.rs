use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::admin;
use crate::middleware::{jwt_auth_middleware, require_admin};
use crate::services::{
    AccountService, ActivityLog, CourseService, RegistrarService, ReportService,
};
use crate::store::DirectoryStore;

/// Shared handler state: the directory services over one store backend.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub courses: CourseService,
    pub registrar: RegistrarService,
    pub reports: ReportService,
    pub activity: ActivityLog,
}

impl AppState {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        let activity = ActivityLog::new(store.clone());
        Self {
            accounts: AccountService::new(store.clone(), activity.clone()),
            courses: CourseService::new(store.clone(), activity.clone()),
            registrar: RegistrarService::new(store.clone(), activity.clone()),
            reports: ReportService::new(store),
            activity,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Admin back-office (JWT + admin role)
        .nest("/api/admin", admin_routes(state))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn admin_routes(state: AppState) -> Router {
    Router::new()
        // Overview + activity feed
        .route("/overview", get(admin::overview::get))
        .route("/activity", get(admin::activity::feed))
        // Manage teachers
        .route(
            "/teachers",
            get(admin::teachers::list).post(admin::teachers::create),
        )
        .route(
            "/teachers/:id",
            get(admin::teachers::get)
                .put(admin::teachers::update)
                .delete(admin::teachers::remove),
        )
        .route(
            "/teachers/:id/assign-course",
            put(admin::teachers::assign_course),
        )
        .route(
            "/teachers/:id/delete-with-courses",
            delete(admin::teachers::remove_with_courses),
        )
        .route(
            "/teachers/:id/orphan-courses",
            delete(admin::teachers::remove_orphan_courses),
        )
        // Manage courses
        .route(
            "/courses",
            get(admin::courses::list).post(admin::courses::create),
        )
        .route(
            "/courses/:id",
            get(admin::courses::get)
                .put(admin::courses::update)
                .delete(admin::courses::remove),
        )
        .route("/courses/:id/approve", put(admin::courses::approve))
        .route("/courses/:id/reject", put(admin::courses::reject))
        // Manage students + enrollment
        .route(
            "/students",
            get(admin::students::list).post(admin::students::create),
        )
        .route(
            "/students/:id",
            get(admin::students::get)
                .put(admin::students::update)
                .delete(admin::students::remove),
        )
        .route("/students/:id/enroll/:course_id", post(admin::students::enroll))
        .route(
            "/students/:id/unenroll/:course_id",
            delete(admin::students::unenroll),
        )
        // Reports + settings
        .route("/reports", get(admin::reports::get))
        .route(
            "/settings",
            get(admin::settings::get).put(admin::settings::update),
        )
        // Auth layers: the JWT check runs first, then the admin gate.
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
        .with_state(state)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Campus Admin API",
            "version": version,
            "description": "Administrative back-office API for a school/e-learning platform",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "overview": "/api/admin/overview (admin)",
                "teachers": "/api/admin/teachers[/:id] (admin)",
                "courses": "/api/admin/courses[/:id] (admin)",
                "students": "/api/admin/students[/:id] (admin)",
                "reports": "/api/admin/reports (admin)",
                "activity": "/api/admin/activity (admin)",
                "settings": "/api/admin/settings (admin)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
