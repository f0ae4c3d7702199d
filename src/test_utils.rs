use crate::router::create_router;
use crate::schemas::AppState;
use axum::Router;
use migration::{Migrator, MigratorTrait};
use model::entities::user;
use moka::future::Cache;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Create an in-memory SQLite database with the billing schema
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

async fn insert_test_coworker(db: &DatabaseConnection, username: &str, first: &str, last: &str) {
    user::ActiveModel {
        username: Set(username.to_string()),
        first_name: Set(first.to_string()),
        last_name: Set(last.to_string()),
        email: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create test coworker");
}

/// Create AppState for testing, with coworkers 1 ("Ada Lovelace") and 2 ("Alan Turing")
pub async fn setup_test_app_state() -> AppState {
    let db = setup_test_db().await;

    insert_test_coworker(&db, "test_user1", "Ada", "Lovelace").await;
    insert_test_coworker(&db, "test_user2", "Alan", "Turing").await;

    AppState {
        db,
        service_cache: Cache::new(100),
        request_timeout: Duration::from_secs(30),
    }
}

/// Initialize tracing for tests with output to STDERR.
///
/// The log level comes from RUST_LOG, defaulting to WARN.
pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| match level.to_uppercase().as_str() {
            "ERROR" => Some(Level::ERROR),
            "WARN" => Some(Level::WARN),
            "INFO" => Some(Level::INFO),
            "DEBUG" => Some(Level::DEBUG),
            "TRACE" => Some(Level::TRACE),
            _ => None,
        })
        .unwrap_or(Level::WARN);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Create axum app for testing
pub async fn setup_test_app() -> Router {
    let state = setup_test_app_state().await;
    create_router(state)
}
