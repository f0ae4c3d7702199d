use crate::handlers::errors::{ApiError, billing_error};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use billing::{BillLineChanges, LineChange, LineTotal, NewBillLine};
use model::entities::bill_line;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for adding a line to a bill
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateBillLineRequest {
    pub service_id: i32,
    /// Number of units (default: 1)
    pub quantity: Option<i32>,
    /// Fixed total. When omitted the total is `service.price * quantity`.
    pub total: Option<Decimal>,
}

impl CreateBillLineRequest {
    pub fn into_new_line(self) -> NewBillLine {
        NewBillLine {
            service_id: self.service_id,
            quantity: self.quantity.unwrap_or(1),
            total: LineTotal::from(self.total),
        }
    }
}

/// Request body for updating a bill line
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateBillLineRequest {
    pub service_id: Option<i32>,
    pub quantity: Option<i32>,
    /// Replace the stored total with this value
    pub total: Option<Decimal>,
    /// Recompute the total from the current service price and quantity
    pub recompute_total: Option<bool>,
}

/// Bill line response model
#[derive(Debug, Serialize, ToSchema)]
pub struct BillLineResponse {
    pub id: i32,
    pub bill_id: i32,
    pub service_id: i32,
    pub quantity: i16,
    pub total: Decimal,
}

impl From<bill_line::Model> for BillLineResponse {
    fn from(model: bill_line::Model) -> Self {
        Self {
            id: model.id,
            bill_id: model.bill_id,
            service_id: model.service_id,
            quantity: model.quantity,
            total: model.total,
        }
    }
}

/// A written line and the amount of its bill afterwards
#[derive(Debug, Serialize, ToSchema)]
pub struct BillLineChangeResponse {
    pub line: BillLineResponse,
    pub bill_amount: Decimal,
}

impl From<LineChange> for BillLineChangeResponse {
    fn from(change: LineChange) -> Self {
        Self {
            line: BillLineResponse::from(change.line),
            bill_amount: change.bill.amount,
        }
    }
}

/// Add a line to a bill
#[utoipa::path(
    post,
    path = "/api/v1/bills/{bill_id}/lines",
    tag = "bill-lines",
    params(
        ("bill_id" = i32, Path, description = "Bill ID"),
    ),
    request_body = CreateBillLineRequest,
    responses(
        (status = 201, description = "Bill line created successfully", body = ApiResponse<BillLineChangeResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Bill not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_bill_line(
    Path(bill_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateBillLineRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<BillLineChangeResponse>>), ApiError> {
    trace!("Entering create_bill_line function for bill_id: {}", bill_id);
    debug!("Adding service {} to bill {}", request.service_id, bill_id);

    let change = billing::add_line(&state.db, bill_id, request.into_new_line())
        .await
        .map_err(billing_error)?;

    info!("Bill line {} created, bill {} amount is now {}",
          change.line.id, bill_id, change.bill.amount);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: BillLineChangeResponse::from(change),
            message: "Bill line created successfully".to_string(),
            success: true,
        }),
    ))
}

/// List the lines of a bill
#[utoipa::path(
    get,
    path = "/api/v1/bills/{bill_id}/lines",
    tag = "bill-lines",
    params(
        ("bill_id" = i32, Path, description = "Bill ID"),
    ),
    responses(
        (status = 200, description = "Bill lines retrieved successfully", body = ApiResponse<Vec<BillLineResponse>>),
        (status = 404, description = "Bill not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_bill_lines(
    Path(bill_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BillLineResponse>>>, ApiError> {
    trace!("Entering get_bill_lines function for bill_id: {}", bill_id);

    let detail = billing::get_bill(&state.db, bill_id)
        .await
        .map_err(billing_error)?;

    info!("Successfully retrieved {} lines of bill {}", detail.lines.len(), bill_id);
    Ok(Json(ApiResponse {
        data: detail.lines.into_iter().map(BillLineResponse::from).collect(),
        message: "Bill lines retrieved successfully".to_string(),
        success: true,
    }))
}

/// Update a bill line
///
/// The total is kept unless `total` or `recompute_total` is given.
#[utoipa::path(
    put,
    path = "/api/v1/bill-lines/{line_id}",
    tag = "bill-lines",
    params(
        ("line_id" = i32, Path, description = "Bill line ID"),
    ),
    request_body = UpdateBillLineRequest,
    responses(
        (status = 200, description = "Bill line updated successfully", body = ApiResponse<BillLineChangeResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Bill line not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_bill_line(
    Path(line_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateBillLineRequest>>,
) -> Result<Json<ApiResponse<BillLineChangeResponse>>, ApiError> {
    trace!("Entering update_bill_line function for line_id: {}", line_id);

    let changes = BillLineChanges {
        service_id: request.service_id,
        quantity: request.quantity,
        total: request.total,
        recompute_total: request.recompute_total.unwrap_or(false),
    };
    let change = billing::update_line(&state.db, line_id, changes)
        .await
        .map_err(billing_error)?;

    info!("Bill line {} updated, bill {} amount is now {}",
          line_id, change.bill.id, change.bill.amount);
    Ok(Json(ApiResponse {
        data: BillLineChangeResponse::from(change),
        message: "Bill line updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a bill line
#[utoipa::path(
    delete,
    path = "/api/v1/bill-lines/{line_id}",
    tag = "bill-lines",
    params(
        ("line_id" = i32, Path, description = "Bill line ID"),
    ),
    responses(
        (status = 200, description = "Bill line deleted successfully", body = ApiResponse<Decimal>),
        (status = 404, description = "Bill line not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_bill_line(
    Path(line_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Decimal>>, ApiError> {
    trace!("Entering delete_bill_line function for line_id: {}", line_id);

    let bill = billing::delete_line(&state.db, line_id)
        .await
        .map_err(billing_error)?;

    info!("Bill line {} deleted, bill {} amount is now {}", line_id, bill.id, bill.amount);
    Ok(Json(ApiResponse {
        data: bill.amount,
        message: "Bill line deleted successfully".to_string(),
        success: true,
    }))
}
