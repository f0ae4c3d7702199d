//! Fixtures shared by the billing tests.

use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use model::entities::{bill, bill_line, service, user};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};
use std::path::PathBuf;

/// Fixed "today" used by the tests, 15 January 2025.
pub fn january_2025() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

/// Create an in-memory SQLite database with all migrations applied
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// A migrated SQLite database file, removed when dropped.
pub struct FileDb {
    pub db: DatabaseConnection,
    path: PathBuf,
}

impl Drop for FileDb {
    fn drop(&mut self) {
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

/// Create a file-backed database so every pooled connection sees the same
/// data and the same locks
pub async fn setup_file_db(name: &str) -> FileDb {
    let path = std::env::temp_dir().join(format!("billjobs-{name}-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let db = Database::connect(format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .expect("Failed to connect to file database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    FileDb { db, path }
}

pub async fn insert_coworker(db: &DatabaseConnection, username: &str) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        first_name: Set("Ada".to_string()),
        last_name: Set("Lovelace".to_string()),
        email: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert coworker")
}

pub async fn insert_service(db: &DatabaseConnection, reference: &str, price: Decimal) -> service::Model {
    service::ActiveModel {
        reference: Set(reference.to_string()),
        name: Set(format!("{reference} service")),
        description: Set(String::new()),
        price: Set(price),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert service")
}

/// Inserts a bill row directly, bypassing numbering and amount maintenance.
pub async fn insert_bill_row(db: &DatabaseConnection, user_id: i32, number: &str) -> bill::Model {
    bill::ActiveModel {
        user_id: Set(user_id),
        number: Set(number.to_string()),
        is_paid: Set(false),
        billing_date: Set(january_2025()),
        amount: Set(Decimal::ZERO),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert bill")
}

/// Inserts a line row directly, bypassing total and amount maintenance.
pub async fn insert_line_row(
    db: &DatabaseConnection,
    bill_id: i32,
    service_id: i32,
    total: Decimal,
) -> bill_line::Model {
    bill_line::ActiveModel {
        bill_id: Set(bill_id),
        service_id: Set(service_id),
        quantity: Set(1),
        total: Set(total),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert bill line")
}
