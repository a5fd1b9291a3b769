use std::sync::Arc;

use campus_admin_api::app::{app, AppState};
use campus_admin_api::database::DatabaseManager;
use campus_admin_api::store::PgDirectoryStore;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = campus_admin_api::config::config();
    tracing::info!("Starting Campus Admin API in {:?} mode", config.environment);

    let pool = DatabaseManager::pool()
        .await
        .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));
    DatabaseManager::migrate()
        .await
        .unwrap_or_else(|e| panic!("failed to run migrations: {}", e));

    let state = AppState::new(Arc::new(PgDirectoryStore::new(pool)));
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("CAMPUS_ADMIN_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Campus Admin API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
