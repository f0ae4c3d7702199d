use moka::future::Cache;
use model::entities::service;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::{OpenApi, ToSchema};

use crate::handlers::{
    bill_lines::{BillLineChangeResponse, BillLineResponse, CreateBillLineRequest, UpdateBillLineRequest},
    bills::{BillDetailResponse, BillResponse, CreateBillRequest, UpdateBillRequest},
    services::{CreateServiceRequest, ServiceResponse, UpdateServiceRequest},
    users::{
        CreateUserRequest, UpdateProfileRequest, UpdateUserRequest, UserProfileResponse,
        UserResponse,
    },
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Catalog services by id
    pub service_cache: Cache<i32, service::Model>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
#[aliases(
    UserApiResponse = ApiResponse<UserResponse>,
    ServiceApiResponse = ApiResponse<ServiceResponse>,
    BillApiResponse = ApiResponse<BillDetailResponse>,
    BillLineApiResponse = ApiResponse<BillLineChangeResponse>
)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            success: false,
        }
    }
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
    /// Bill number counter status
    pub bill_sequence: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::create_user,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::users::get_user_profile,
        crate::handlers::users::update_user_profile,
        crate::handlers::services::create_service,
        crate::handlers::services::get_services,
        crate::handlers::services::get_service,
        crate::handlers::services::update_service,
        crate::handlers::services::delete_service,
        crate::handlers::bills::create_bill,
        crate::handlers::bills::get_bills,
        crate::handlers::bills::get_bill,
        crate::handlers::bills::update_bill,
        crate::handlers::bills::delete_bill,
        crate::handlers::bill_lines::create_bill_line,
        crate::handlers::bill_lines::get_bill_lines,
        crate::handlers::bill_lines::update_bill_line,
        crate::handlers::bill_lines::delete_bill_line,
    ),
    components(
        schemas(
            UserApiResponse,
            ServiceApiResponse,
            BillApiResponse,
            BillLineApiResponse,
            ErrorResponse,
            HealthResponse,
            CreateUserRequest,
            UpdateUserRequest,
            UserResponse,
            UpdateProfileRequest,
            UserProfileResponse,
            CreateServiceRequest,
            UpdateServiceRequest,
            ServiceResponse,
            CreateBillRequest,
            UpdateBillRequest,
            BillResponse,
            BillDetailResponse,
            CreateBillLineRequest,
            UpdateBillLineRequest,
            BillLineResponse,
            BillLineChangeResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Coworkers and their billing profiles"),
        (name = "services", description = "Service catalog"),
        (name = "bills", description = "Bills"),
        (name = "bill-lines", description = "Bill line items"),
    ),
    info(
        title = "billjobs API",
        description = "Coworking billing API - bills, their line items and the service catalog",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
