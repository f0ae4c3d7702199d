use crate::handlers::errors::{ApiError, database_error};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use model::entities::{user, user_profile};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a new coworker
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Username (must be unique)
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    /// Creates the billing profile together with the coworker
    #[validate(length(max = 1024))]
    pub billing_address: Option<String>,
}

/// Request body for updating a coworker
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    /// Username (must be unique)
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Coworker response model
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    /// `"<first_name> <last_name>"`
    pub full_name: String,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            full_name: model.full_name(),
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
        }
    }
}

/// Request body for creating or replacing a billing profile
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 1024))]
    pub billing_address: String,
}

/// Billing profile response model
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfileResponse {
    pub id: i32,
    pub user_id: i32,
    pub billing_address: String,
}

impl From<user_profile::Model> for UserProfileResponse {
    fn from(model: user_profile::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            billing_address: model.billing_address,
        }
    }
}

fn username_conflict(db_error: &DbErr, username: &str) -> Option<ApiError> {
    match db_error.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Some((
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(
                format!("Username '{}' already exists", username),
                "USERNAME_ALREADY_EXISTS",
            )),
        )),
        _ => None,
    }
}

fn user_not_found(user_id: i32) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            format!("User with id {} does not exist", user_id),
            "USER_NOT_FOUND",
        )),
    )
}

async fn insert_user<C: ConnectionTrait>(
    db: &C,
    request: &CreateUserRequest,
) -> Result<user::Model, DbErr> {
    let new_user = user::ActiveModel {
        username: Set(request.username.clone()),
        first_name: Set(request.first_name.clone().unwrap_or_default()),
        last_name: Set(request.last_name.clone().unwrap_or_default()),
        email: Set(request.email.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    if let Some(billing_address) = &request.billing_address {
        debug!("Creating billing profile for user {}", new_user.id);
        user_profile::ActiveModel {
            user_id: Set(new_user.id),
            billing_address: Set(billing_address.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(new_user)
}

/// Create a new coworker
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_user(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateUserRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    trace!("Entering create_user function");
    debug!("Creating user with username: {}", request.username);

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| database_error(e, "Failed to start transaction"))?;

    let created = match insert_user(&txn, &request).await {
        Ok(user_model) => user_model,
        Err(db_error) => {
            error!("Failed to create user '{}': {}", request.username, db_error);
            return Err(username_conflict(&db_error, &request.username).unwrap_or_else(|| {
                database_error(db_error, "Internal server error while creating user")
            }));
        }
    };

    txn.commit()
        .await
        .map_err(|e| database_error(e, "Failed to commit user creation"))?;

    info!("User created successfully with ID: {}, username: {}",
          created.id, created.username);
    let response = ApiResponse {
        data: UserResponse::from(created),
        message: "User created successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get all coworkers
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    trace!("Entering get_users function");

    match user::Entity::find().all(&state.db).await {
        Ok(users) => {
            info!("Successfully retrieved {} users", users.len());
            let response = ApiResponse {
                data: users.into_iter().map(UserResponse::from).collect(),
                message: "Users retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(db_error) => Err(database_error(db_error, "Failed to retrieve users")),
    }
}

/// Get a specific coworker by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering get_user function for user_id: {}", user_id);

    match user::Entity::find_by_id(user_id).one(&state.db).await {
        Ok(Some(user_model)) => {
            debug!("Retrieved user {}", user_model.username);
            let response = ApiResponse {
                data: UserResponse::from(user_model),
                message: "User retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Ok(None) => {
            warn!("User with ID {} not found", user_id);
            Err(user_not_found(user_id))
        }
        Err(db_error) => Err(database_error(db_error, "Failed to retrieve user")),
    }
}

/// Update a coworker
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateUserRequest>>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering update_user function for user_id: {}", user_id);

    let existing_user = match user::Entity::find_by_id(user_id).one(&state.db).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("User with ID {} not found for update", user_id);
            return Err(user_not_found(user_id));
        }
        Err(db_error) => return Err(database_error(db_error, "Failed to lookup user for update")),
    };

    let mut user_active: user::ActiveModel = existing_user.into();
    let mut updated_fields = Vec::new();

    // Update only provided fields
    if let Some(username) = &request.username {
        user_active.username = Set(username.clone());
        updated_fields.push("username");
    }
    if let Some(first_name) = &request.first_name {
        user_active.first_name = Set(first_name.clone());
        updated_fields.push("first_name");
    }
    if let Some(last_name) = &request.last_name {
        user_active.last_name = Set(last_name.clone());
        updated_fields.push("last_name");
    }
    if let Some(email) = &request.email {
        user_active.email = Set(Some(email.clone()));
        updated_fields.push("email");
    }
    debug!("Updating fields: {:?}", updated_fields);

    match user_active.update(&state.db).await {
        Ok(updated_user) => {
            info!("User with ID {} updated successfully", user_id);
            let response = ApiResponse {
                data: UserResponse::from(updated_user),
                message: "User updated successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(db_error) => {
            let username = request.username.as_deref().unwrap_or_default();
            Err(username_conflict(&db_error, username)
                .unwrap_or_else(|| database_error(db_error, "Failed to update user")))
        }
    }
}

/// Delete a coworker together with their bills
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    trace!("Entering delete_user function for user_id: {}", user_id);

    match user::Entity::delete_by_id(user_id).exec(&state.db).await {
        Ok(delete_result) if delete_result.rows_affected > 0 => {
            info!("User with ID {} deleted successfully", user_id);
            let response = ApiResponse {
                data: format!("User {} deleted", user_id),
                message: "User deleted successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Ok(_) => {
            warn!("User with ID {} not found for deletion (no rows affected)", user_id);
            Err(user_not_found(user_id))
        }
        Err(db_error) => Err(database_error(db_error, "Failed to delete user")),
    }
}

/// Get the billing profile of a coworker
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/profile",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<UserProfileResponse>),
        (status = 404, description = "User has no profile", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user_profile(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserProfileResponse>>, ApiError> {
    let profile = user_profile::Entity::find()
        .filter(user_profile::Column::UserId.eq(user_id))
        .one(&state.db)
        .await;

    match profile {
        Ok(Some(profile)) => Ok(Json(ApiResponse {
            data: UserProfileResponse::from(profile),
            message: "Profile retrieved successfully".to_string(),
            success: true,
        })),
        Ok(None) => {
            warn!("User {} has no billing profile", user_id);
            Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(
                    format!("User {} has no billing profile", user_id),
                    "PROFILE_NOT_FOUND",
                )),
            ))
        }
        Err(db_error) => Err(database_error(db_error, "Failed to retrieve profile")),
    }
}

/// Create or replace the billing profile of a coworker
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}/profile",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile saved successfully", body = ApiResponse<UserProfileResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_user_profile(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateProfileRequest>>,
) -> Result<Json<ApiResponse<UserProfileResponse>>, ApiError> {
    trace!("Entering update_user_profile for user_id: {}", user_id);

    match user::Entity::find_by_id(user_id).one(&state.db).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("Attempted to save a profile for non-existent user_id: {}", user_id);
            return Err(user_not_found(user_id));
        }
        Err(db_error) => return Err(database_error(db_error, "Failed to lookup user")),
    }

    let existing = user_profile::Entity::find()
        .filter(user_profile::Column::UserId.eq(user_id))
        .one(&state.db)
        .await
        .map_err(|e| database_error(e, "Failed to lookup profile"))?;

    let saved = match existing {
        Some(profile) => {
            debug!("Replacing billing address of user {}", user_id);
            let mut active: user_profile::ActiveModel = profile.into();
            active.billing_address = Set(request.billing_address.clone());
            active.update(&state.db).await
        }
        None => {
            debug!("Creating billing profile for user {}", user_id);
            user_profile::ActiveModel {
                user_id: Set(user_id),
                billing_address: Set(request.billing_address.clone()),
                ..Default::default()
            }
            .insert(&state.db)
            .await
        }
    }
    .map_err(|e| database_error(e, "Failed to save profile"))?;

    info!("Billing profile of user {} saved", user_id);
    Ok(Json(ApiResponse {
        data: UserProfileResponse::from(saved),
        message: "Profile saved successfully".to_string(),
        success: true,
    }))
}
