use crate::handlers::bill_lines::{BillLineResponse, CreateBillLineRequest};
use crate::handlers::errors::{ApiError, billing_error, database_error};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use billing::{BillChanges, BillDetail, NewBill};
use chrono::{NaiveDate, Utc};
use model::entities::{bill, user};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating a bill
///
/// Number, billing date and amount are assigned by the server.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateBillRequest {
    /// Coworker the bill is issued to
    pub user_id: i32,
    /// Whether the bill is already paid (default: false)
    pub is_paid: Option<bool>,
    /// Lines to create together with the bill
    #[validate(nested)]
    pub lines: Option<Vec<CreateBillLineRequest>>,
}

/// Request body for updating a bill
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateBillRequest {
    /// Reassign the bill to another coworker
    pub user_id: Option<i32>,
    pub is_paid: Option<bool>,
}

/// Query parameters for listing bills
#[derive(Debug, Deserialize, ToSchema, IntoParams, Validate)]
pub struct BillQuery {
    /// Page number (default: 1)
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    /// Page size (default: 50)
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
    /// Only bills of this coworker
    pub user_id: Option<i32>,
    /// Only paid or only unpaid bills
    pub is_paid: Option<bool>,
}

/// Bill response model
#[derive(Debug, Serialize, ToSchema)]
pub struct BillResponse {
    pub id: i32,
    pub user_id: i32,
    /// `"<first_name> <last_name>"` of the coworker
    pub coworker_name: String,
    pub number: String,
    pub is_paid: bool,
    pub billing_date: NaiveDate,
    /// Sum of the line totals
    pub amount: Decimal,
}

impl BillResponse {
    fn new(model: bill::Model, coworker: Option<&user::Model>) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            coworker_name: coworker.map(user::Model::full_name).unwrap_or_default(),
            number: model.number,
            is_paid: model.is_paid,
            billing_date: model.billing_date,
            amount: model.amount,
        }
    }
}

/// Bill with its lines
#[derive(Debug, Serialize, ToSchema)]
pub struct BillDetailResponse {
    pub bill: BillResponse,
    pub lines: Vec<BillLineResponse>,
}

impl From<BillDetail> for BillDetailResponse {
    fn from(detail: BillDetail) -> Self {
        Self {
            bill: BillResponse::new(detail.bill, detail.coworker.as_ref()),
            lines: detail.lines.into_iter().map(BillLineResponse::from).collect(),
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Create a bill, optionally with its lines
#[utoipa::path(
    post,
    path = "/api/v1/bills",
    tag = "bills",
    request_body = CreateBillRequest,
    responses(
        (status = 201, description = "Bill created successfully", body = ApiResponse<BillDetailResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Bill number conflict, or database busy with a concurrent write", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_bill(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateBillRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<BillDetailResponse>>), ApiError> {
    trace!("Entering create_bill function");
    debug!("Creating bill for user_id: {}", request.user_id);

    let new_bill = NewBill {
        user_id: request.user_id,
        is_paid: request.is_paid.unwrap_or(false),
        lines: request
            .lines
            .unwrap_or_default()
            .into_iter()
            .map(CreateBillLineRequest::into_new_line)
            .collect(),
    };

    let detail = billing::create_bill(&state.db, new_bill, today())
        .await
        .map_err(billing_error)?;

    info!("Bill {} created with ID: {}", detail.bill.number, detail.bill.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: BillDetailResponse::from(detail),
            message: "Bill created successfully".to_string(),
            success: true,
        }),
    ))
}

/// List bills
#[utoipa::path(
    get,
    path = "/api/v1/bills",
    tag = "bills",
    params(BillQuery),
    responses(
        (status = 200, description = "Bills retrieved successfully", body = ApiResponse<Vec<BillResponse>>),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_bills(
    Valid(Query(query)): Valid<Query<BillQuery>>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BillResponse>>>, ApiError> {
    trace!("Entering get_bills function");

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(50);
    debug!("Fetching bills - page: {}, limit: {}", page, limit);

    let mut query_builder = bill::Entity::find();
    if let Some(user_id) = query.user_id {
        query_builder = query_builder.filter(bill::Column::UserId.eq(user_id));
    }
    if let Some(is_paid) = query.is_paid {
        query_builder = query_builder.filter(bill::Column::IsPaid.eq(is_paid));
    }

    let bills = query_builder
        .find_also_related(user::Entity)
        .order_by_asc(bill::Column::Id)
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error(e, "Failed to retrieve bills"))?;

    info!("Successfully retrieved {} bills", bills.len());
    Ok(Json(ApiResponse {
        data: bills
            .into_iter()
            .map(|(bill, coworker)| BillResponse::new(bill, coworker.as_ref()))
            .collect(),
        message: "Bills retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a bill with its lines
#[utoipa::path(
    get,
    path = "/api/v1/bills/{bill_id}",
    tag = "bills",
    params(
        ("bill_id" = i32, Path, description = "Bill ID"),
    ),
    responses(
        (status = 200, description = "Bill retrieved successfully", body = ApiResponse<BillDetailResponse>),
        (status = 404, description = "Bill not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_bill(
    Path(bill_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BillDetailResponse>>, ApiError> {
    trace!("Entering get_bill function for bill_id: {}", bill_id);

    let detail = billing::get_bill(&state.db, bill_id)
        .await
        .map_err(billing_error)?;

    Ok(Json(ApiResponse {
        data: BillDetailResponse::from(detail),
        message: "Bill retrieved successfully".to_string(),
        success: true,
    }))
}

/// Update a bill
///
/// The number and billing date never change; the amount is recomputed.
#[utoipa::path(
    put,
    path = "/api/v1/bills/{bill_id}",
    tag = "bills",
    params(
        ("bill_id" = i32, Path, description = "Bill ID"),
    ),
    request_body = UpdateBillRequest,
    responses(
        (status = 200, description = "Bill updated successfully", body = ApiResponse<BillDetailResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Bill not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_bill(
    Path(bill_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateBillRequest>>,
) -> Result<Json<ApiResponse<BillDetailResponse>>, ApiError> {
    trace!("Entering update_bill function for bill_id: {}", bill_id);

    let changes = BillChanges {
        user_id: request.user_id,
        is_paid: request.is_paid,
    };
    let detail = billing::update_bill(&state.db, bill_id, changes)
        .await
        .map_err(billing_error)?;

    info!("Bill with ID {} updated successfully", bill_id);
    Ok(Json(ApiResponse {
        data: BillDetailResponse::from(detail),
        message: "Bill updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a bill and its lines
#[utoipa::path(
    delete,
    path = "/api/v1/bills/{bill_id}",
    tag = "bills",
    params(
        ("bill_id" = i32, Path, description = "Bill ID"),
    ),
    responses(
        (status = 200, description = "Bill deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Bill not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_bill(
    Path(bill_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_bill function for bill_id: {}", bill_id);

    billing::delete_bill(&state.db, bill_id)
        .await
        .map_err(billing_error)?;

    info!("Bill with ID {} deleted successfully", bill_id);
    Ok(Json(ApiResponse {
        data: format!("Bill {} deleted", bill_id),
        message: "Bill deleted successfully".to_string(),
        success: true,
    }))
}
