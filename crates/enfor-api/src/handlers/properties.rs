//! Property listing handlers
//!
//! Every operation is scoped to the authenticated broker.

use std::sync::Arc;

use axum::{extract::State, Extension};
use enfor_core::{CreatePropertyRequest, Property, UpdatePropertyRequest};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::{ApiPath, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/properties",
    tag = "properties",
    request_body = CreatePropertyRequest,
    responses(
        (status = 201, description = "Property created successfully", body = Property),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_property(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreatePropertyRequest>,
) -> Result<ApiResponse<Property>, AppError> {
    let property = state.properties.create(user.user_id, request).await?;
    Ok(ApiResponse::created("Property created successfully", property))
}

/// List the caller's listings, newest first
#[utoipa::path(
    get,
    path = "/api/properties",
    tag = "properties",
    responses(
        (status = 200, description = "Properties retrieved successfully", body = [Property]),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_properties(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<Vec<Property>>, AppError> {
    let properties = state.properties.list(user.user_id).await?;
    Ok(ApiResponse::ok("Properties retrieved successfully", properties))
}

#[utoipa::path(
    get,
    path = "/api/properties/{id}",
    tag = "properties",
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "Property retrieved successfully", body = Property),
        (status = 404, description = "Property not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_property(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Property>, AppError> {
    let property = state.properties.get(id, user.user_id).await?;
    Ok(ApiResponse::ok("Property retrieved successfully", property))
}

/// Partial update; the apartment and house room rule applies to the merged listing
#[utoipa::path(
    put,
    path = "/api/properties/{id}",
    tag = "properties",
    params(("id" = Uuid, Path, description = "Property id")),
    request_body = UpdatePropertyRequest,
    responses(
        (status = 200, description = "Property updated successfully", body = Property),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 404, description = "Property not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_property(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<UpdatePropertyRequest>,
) -> Result<ApiResponse<Property>, AppError> {
    let property = state.properties.update(id, user.user_id, patch).await?;
    Ok(ApiResponse::ok("Property updated successfully", property))
}

#[utoipa::path(
    delete,
    path = "/api/properties/{id}",
    tag = "properties",
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "Property deleted successfully"),
        (status = 404, description = "Property not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_property(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    state.properties.delete(id, user.user_id).await?;
    Ok(ApiResponse::message("Property deleted successfully"))
}
