use crate::schemas::ErrorResponse;
use axum::{http::StatusCode, response::Json};
use billing::BillingError;
use sea_orm::DbErr;
use tracing::{error, warn};

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a billing error to the HTTP status and error code returned to the client
pub fn billing_error(err: BillingError) -> ApiError {
    let (status, code) = match &err {
        BillingError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        BillingError::DatabaseBusy(_) => (StatusCode::CONFLICT, "DATABASE_BUSY"),
        BillingError::CoworkerNotFound(_) => (StatusCode::BAD_REQUEST, "INVALID_USER_ID"),
        BillingError::BillNotFound(_) => (StatusCode::NOT_FOUND, "BILL_NOT_FOUND"),
        BillingError::BillLineNotFound(_) => (StatusCode::NOT_FOUND, "BILL_LINE_NOT_FOUND"),
        BillingError::ServiceNotFound(_) => (StatusCode::BAD_REQUEST, "INVALID_SERVICE_ID"),
        BillingError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, "INVALID_QUANTITY"),
        BillingError::NegativeAmount { .. } => (StatusCode::BAD_REQUEST, "NEGATIVE_AMOUNT"),
        BillingError::AmountOutOfRange { .. } => (StatusCode::BAD_REQUEST, "AMOUNT_OUT_OF_RANGE"),
        BillingError::NumberConflict(_) => (StatusCode::CONFLICT, "BILL_NUMBER_CONFLICT"),
        BillingError::MalformedBillNumber(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "MALFORMED_BILL_NUMBER")
        }
        BillingError::SequenceMissing => (StatusCode::INTERNAL_SERVER_ERROR, "SEQUENCE_MISSING"),
    };

    let message = match &err {
        // Don't leak SQL to clients
        BillingError::Database(db_error) => {
            error!("Database error in billing operation: {}", db_error);
            "Internal server error".to_string()
        }
        BillingError::DatabaseBusy(db_error) => {
            warn!("Billing operation hit lock contention: {}", db_error);
            err.to_string()
        }
        other => other.to_string(),
    };

    (status, Json(ErrorResponse::new(message, code)))
}

/// Generic 500 with a handler-specific message, or 409 when the database was
/// only busy with a concurrent write
pub fn database_error(db_error: DbErr, message: &str) -> ApiError {
    if billing::is_lock_contention(&db_error) {
        warn!("{}: {}", message, db_error);
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(
                "Database is busy with a concurrent write, retry the request",
                "DATABASE_BUSY",
            )),
        );
    }
    error!("{}: {}", message, db_error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message, "DATABASE_ERROR")),
    )
}
