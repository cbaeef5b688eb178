//! Role dashboards
//!
//! Each route sits behind a role check; the handlers only report who is
//! looking. The broker view also carries appointment counters.

use std::sync::Arc;

use axum::{extract::State, Extension};
use enfor_core::AppointmentStats;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<AppointmentStats>,
}

#[utoipa::path(
    get,
    path = "/api/broker/dashboard",
    tag = "dashboards",
    responses(
        (status = 200, description = "Broker dashboard", body = DashboardResponse),
        (status = 403, description = "Role not allowed", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn broker_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<DashboardResponse>, AppError> {
    let stats = state.appointments.stats(user.user_id).await?;
    Ok(ApiResponse::ok(
        "Welcome to broker dashboard",
        DashboardResponse {
            user_id: user.user_id,
            stats: Some(stats),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/api/channel-partner/dashboard",
    tag = "dashboards",
    responses(
        (status = 200, description = "Channel partner dashboard", body = DashboardResponse),
        (status = 403, description = "Role not allowed", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn channel_partner_dashboard(
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResponse<DashboardResponse> {
    ApiResponse::ok(
        "Welcome to channel partner dashboard",
        DashboardResponse {
            user_id: user.user_id,
            stats: None,
        },
    )
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "dashboards",
    responses(
        (status = 200, description = "Admin dashboard", body = DashboardResponse),
        (status = 403, description = "Role not allowed", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn admin_dashboard(
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResponse<DashboardResponse> {
    ApiResponse::ok(
        "Welcome to admin dashboard",
        DashboardResponse {
            user_id: user.user_id,
            stats: None,
        },
    )
}
