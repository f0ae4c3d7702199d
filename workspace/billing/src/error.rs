use sea_orm::{DbErr, RuntimeErr, SqlErr};
use thiserror::Error;
use tracing::warn;

/// Error types for the billing service layer
#[derive(Error, Debug)]
pub enum BillingError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[source] DbErr),

    /// A concurrent write holds the database lock; the operation can be retried
    #[error("Database is busy with a concurrent write, retry the request")]
    DatabaseBusy(#[source] DbErr),

    /// The coworker a bill refers to does not exist
    #[error("Coworker with id {0} does not exist")]
    CoworkerNotFound(i32),

    #[error("Bill with id {0} does not exist")]
    BillNotFound(i32),

    #[error("Bill line with id {0} does not exist")]
    BillLineNotFound(i32),

    /// The catalog service a line refers to does not exist
    #[error("Service with id {0} does not exist")]
    ServiceNotFound(i32),

    /// Quantities are positive and fit the `bill_lines.quantity` column
    #[error("Quantity must be between 1 and {}, got {0}", i16::MAX)]
    InvalidQuantity(i32),

    /// Prices and line totals cannot be negative
    #[error("{field} cannot be negative, got {value}")]
    NegativeAmount {
        field: &'static str,
        value: rust_decimal::Decimal,
    },

    /// Money values are stored as `Decimal(16, 4)`
    #[error("{field} must have at most 12 integer digits and 4 decimal places, got {value}")]
    AmountOutOfRange {
        field: &'static str,
        value: rust_decimal::Decimal,
    },

    /// A stored bill number does not follow `F<YYYYMM><NNN>`
    #[error("Malformed bill number: {0}")]
    MalformedBillNumber(String),

    /// Another bill already carries this number
    #[error("Bill number {0} is already taken")]
    NumberConflict(String),

    /// The `bill_sequences` counter row is missing; run the migrations or `resync-sequence`
    #[error("Bill sequence counter is missing")]
    SequenceMissing,
}

impl BillingError {
    /// Turns a failed bill insert into a `NumberConflict` when the unique
    /// index on `bills.number` rejected it, keeping every other error as is.
    pub(crate) fn from_bill_insert(error: DbErr, number: &str) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                warn!(%number, %detail, "Bill number collided with an existing bill");
                BillingError::NumberConflict(number.to_string())
            }
            _ => BillingError::from(error),
        }
    }
}

/// SQLite `BUSY`/`LOCKED` (plain and extended) and Postgres serialization
/// failure or deadlock.
const LOCK_CONTENTION_CODES: &[&str] = &["5", "6", "261", "517", "40001", "40P01"];

/// Whether the database refused the statement because another transaction
/// holds a conflicting lock.
pub fn is_lock_contention(error: &DbErr) -> bool {
    match error {
        DbErr::Conn(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db)))
        | DbErr::Exec(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db)))
        | DbErr::Query(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db))) => db
            .code()
            .is_some_and(|code| LOCK_CONTENTION_CODES.contains(&&*code)),
        _ => false,
    }
}

impl From<DbErr> for BillingError {
    fn from(error: DbErr) -> Self {
        if is_lock_contention(&error) {
            warn!(%error, "Database lock contention");
            BillingError::DatabaseBusy(error)
        } else {
            BillingError::Database(error)
        }
    }
}

/// Type alias for Result with BillingError
pub type Result<T> = std::result::Result<T, BillingError>;
