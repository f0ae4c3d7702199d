use crate::handlers::errors::{ApiError, billing_error, database_error};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use model::entities::{bill_line, service};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a catalog service
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateServiceRequest {
    /// Short reference code (at most 5 characters)
    #[validate(length(min = 1, max = 5))]
    pub reference: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    /// Unit price, must not be negative
    pub price: Decimal,
}

/// Request body for updating a catalog service
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 5))]
    pub reference: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    /// New unit price. Existing line totals are not affected.
    pub price: Option<Decimal>,
}

/// Catalog service response model
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceResponse {
    pub id: i32,
    pub reference: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
}

impl From<service::Model> for ServiceResponse {
    fn from(model: service::Model) -> Self {
        Self {
            id: model.id,
            reference: model.reference,
            name: model.name,
            description: model.description,
            price: model.price,
        }
    }
}

fn service_not_found(service_id: i32) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            format!("Service with id {} does not exist", service_id),
            "SERVICE_NOT_FOUND",
        )),
    )
}

/// Create a catalog service
#[utoipa::path(
    post,
    path = "/api/v1/services",
    tag = "services",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created successfully", body = ApiResponse<ServiceResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_service(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateServiceRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ServiceResponse>>), ApiError> {
    trace!("Entering create_service function");
    billing::validate_amount("price", request.price).map_err(billing_error)?;

    let new_service = service::ActiveModel {
        reference: Set(request.reference.clone()),
        name: Set(request.name.clone()),
        description: Set(request.description.clone().unwrap_or_default()),
        price: Set(request.price),
        ..Default::default()
    };

    let created = new_service
        .insert(&state.db)
        .await
        .map_err(|e| database_error(e, "Failed to create service"))?;

    info!("Service created with ID: {}, reference: {}, price: {}",
          created.id, created.reference, created.price);
    state.service_cache.insert(created.id, created.clone()).await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ServiceResponse::from(created),
            message: "Service created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Get the whole service catalog
#[utoipa::path(
    get,
    path = "/api/v1/services",
    tag = "services",
    responses(
        (status = 200, description = "Services retrieved successfully", body = ApiResponse<Vec<ServiceResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_services(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ServiceResponse>>>, ApiError> {
    trace!("Entering get_services function");

    match service::Entity::find()
        .order_by_asc(service::Column::Reference)
        .all(&state.db)
        .await
    {
        Ok(services) => {
            info!("Successfully retrieved {} services", services.len());
            Ok(Json(ApiResponse {
                data: services.into_iter().map(ServiceResponse::from).collect(),
                message: "Services retrieved successfully".to_string(),
                success: true,
            }))
        }
        Err(db_error) => Err(database_error(db_error, "Failed to retrieve services")),
    }
}

/// Get a catalog service by ID
#[utoipa::path(
    get,
    path = "/api/v1/services/{service_id}",
    tag = "services",
    params(
        ("service_id" = i32, Path, description = "Service ID"),
    ),
    responses(
        (status = 200, description = "Service retrieved successfully", body = ApiResponse<ServiceResponse>),
        (status = 404, description = "Service not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_service(
    Path(service_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ServiceResponse>>, ApiError> {
    trace!("Entering get_service function for service_id: {}", service_id);

    let service = match state.service_cache.get(&service_id).await {
        Some(cached) => {
            debug!("Service {} served from cache", service_id);
            cached
        }
        None => match service::Entity::find_by_id(service_id).one(&state.db).await {
            Ok(Some(found)) => {
                state.service_cache.insert(service_id, found.clone()).await;
                found
            }
            Ok(None) => {
                warn!("Service with ID {} not found", service_id);
                return Err(service_not_found(service_id));
            }
            Err(db_error) => return Err(database_error(db_error, "Failed to retrieve service")),
        },
    };

    Ok(Json(ApiResponse {
        data: ServiceResponse::from(service),
        message: "Service retrieved successfully".to_string(),
        success: true,
    }))
}

/// Update a catalog service
#[utoipa::path(
    put,
    path = "/api/v1/services/{service_id}",
    tag = "services",
    params(
        ("service_id" = i32, Path, description = "Service ID"),
    ),
    request_body = UpdateServiceRequest,
    responses(
        (status = 200, description = "Service updated successfully", body = ApiResponse<ServiceResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Service not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_service(
    Path(service_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateServiceRequest>>,
) -> Result<Json<ApiResponse<ServiceResponse>>, ApiError> {
    trace!("Entering update_service function for service_id: {}", service_id);
    if let Some(price) = request.price {
        billing::validate_amount("price", price).map_err(billing_error)?;
    }

    let existing = service::Entity::find_by_id(service_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error(e, "Failed to lookup service for update"))?
        .ok_or_else(|| service_not_found(service_id))?;

    let mut active: service::ActiveModel = existing.into();
    if let Some(reference) = &request.reference {
        active.reference = Set(reference.clone());
    }
    if let Some(name) = &request.name {
        active.name = Set(name.clone());
    }
    if let Some(description) = &request.description {
        active.description = Set(description.clone());
    }
    if let Some(price) = request.price {
        debug!("Changing price of service {} to {}", service_id, price);
        active.price = Set(price);
    }

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error(e, "Failed to update service"))?;
    state.service_cache.invalidate(&service_id).await;

    info!("Service with ID {} updated successfully", service_id);
    Ok(Json(ApiResponse {
        data: ServiceResponse::from(updated),
        message: "Service updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a catalog service that no bill line refers to
#[utoipa::path(
    delete,
    path = "/api/v1/services/{service_id}",
    tag = "services",
    params(
        ("service_id" = i32, Path, description = "Service ID"),
    ),
    responses(
        (status = 200, description = "Service deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Service not found", body = ErrorResponse),
        (status = 409, description = "Service is used by bill lines", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_service(
    Path(service_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_service function for service_id: {}", service_id);

    let usages = bill_line::Entity::find()
        .filter(bill_line::Column::ServiceId.eq(service_id))
        .count(&state.db)
        .await
        .map_err(|e| database_error(e, "Failed to check service usage"))?;

    if usages > 0 {
        warn!("Refusing to delete service {} used by {} bill lines", service_id, usages);
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(
                format!("Service with id {} is used by {} bill lines", service_id, usages),
                "SERVICE_IN_USE",
            )),
        ));
    }

    let result = service::Entity::delete_by_id(service_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error(e, "Failed to delete service"))?;
    state.service_cache.invalidate(&service_id).await;

    if result.rows_affected == 0 {
        warn!("Service with ID {} not found for deletion", service_id);
        return Err(service_not_found(service_id));
    }

    info!("Service with ID {} deleted successfully", service_id);
    Ok(Json(ApiResponse {
        data: format!("Service {} deleted", service_id),
        message: "Service deleted successfully".to_string(),
        success: true,
    }))
}
