//! Client handlers
//!
//! Every operation is scoped to the authenticated broker; ids belonging to
//! another broker answer 404 exactly like ids that do not exist.

use std::sync::Arc;

use axum::{extract::State, Extension};
use enfor_core::{Client, CreateClientRequest, UpdateClientRequest};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::{ApiPath, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created successfully", body = Client),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateClientRequest>,
) -> Result<ApiResponse<Client>, AppError> {
    let client = state.clients.create(user.user_id, request).await?;
    Ok(ApiResponse::created("Client created successfully", client))
}

/// List the caller's clients, newest first
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "clients",
    responses(
        (status = 200, description = "Clients retrieved successfully", body = [Client]),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<Vec<Client>>, AppError> {
    let clients = state.clients.list(user.user_id).await?;
    Ok(ApiResponse::ok("Clients retrieved successfully", clients))
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client retrieved successfully", body = Client),
        (status = 404, description = "Client not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Client>, AppError> {
    let client = state.clients.get(id, user.user_id).await?;
    Ok(ApiResponse::ok("Client retrieved successfully", client))
}

/// Partial update; appointments booked with the client pick up a new name or phone
#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client id")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated successfully", body = Client),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 404, description = "Client not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_client(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<UpdateClientRequest>,
) -> Result<ApiResponse<Client>, AppError> {
    let client = state.clients.update(id, user.user_id, patch).await?;
    Ok(ApiResponse::ok("Client updated successfully", client))
}

#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client deleted successfully"),
        (status = 404, description = "Client not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    state.clients.delete(id, user.user_id).await?;
    Ok(ApiResponse::message("Client deleted successfully"))
}
