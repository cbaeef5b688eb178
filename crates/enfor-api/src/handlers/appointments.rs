//! Appointment handlers
//!
//! Client and property references in a request must belong to the caller;
//! anything else is rejected with 400 `INVALID_REFERENCE` before a write.

use std::sync::Arc;

use axum::{extract::State, Extension};
use enfor_core::{
    Appointment, AppointmentFilter, AppointmentStats, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::{ApiPath, ApiQuery, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment created successfully", body = Appointment),
        (status = 400, description = "Invalid input or reference", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateAppointmentRequest>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let appointment = state.appointments.create(user.user_id, request).await?;
    Ok(ApiResponse::created(
        "Appointment created successfully",
        appointment,
    ))
}

/// List the caller's appointments
///
/// Filters combine with AND; results are ordered by date, then time.
#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "appointments",
    params(AppointmentFilter),
    responses(
        (status = 200, description = "Appointments retrieved successfully", body = [Appointment]),
        (status = 400, description = "Invalid filter", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> Result<ApiResponse<Vec<Appointment>>, AppError> {
    let appointments = state.appointments.list(user.user_id, &filter).await?;
    Ok(ApiResponse::ok(
        "Appointments retrieved successfully",
        appointments,
    ))
}

#[utoipa::path(
    get,
    path = "/api/appointments/stats",
    tag = "appointments",
    responses(
        (
            status = 200,
            description = "Appointment statistics retrieved successfully",
            body = AppointmentStats
        ),
    ),
    security(("bearer_auth" = []))
)]
pub async fn appointment_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<AppointmentStats>, AppError> {
    let stats = state.appointments.stats(user.user_id).await?;
    Ok(ApiResponse::ok(
        "Appointment statistics retrieved successfully",
        stats,
    ))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment retrieved successfully", body = Appointment),
        (status = 404, description = "Appointment not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let appointment = state.appointments.get(id, user.user_id).await?;
    Ok(ApiResponse::ok(
        "Appointment retrieved successfully",
        appointment,
    ))
}

/// Partial update
///
/// An empty `property_id` removes the property link.
#[utoipa::path(
    put,
    path = "/api/appointments/{id}",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated successfully", body = Appointment),
        (status = 400, description = "Invalid input or reference", body = crate::error::ApiError),
        (status = 404, description = "Appointment not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<UpdateAppointmentRequest>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let appointment = state.appointments.update(id, user.user_id, patch).await?;
    Ok(ApiResponse::ok(
        "Appointment updated successfully",
        appointment,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/appointments/{id}",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment deleted successfully"),
        (status = 404, description = "Appointment not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    state.appointments.delete(id, user.user_id).await?;
    Ok(ApiResponse::message("Appointment deleted successfully"))
}
