//! OpenAPI document
//!
//! Served at `/api-docs/openapi.json`.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Enfor Data API",
        description = "Brokerage backend: accounts, clients, property listings and appointments, \
                       each scoped to the owning broker."
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::readiness_check,
        crate::handlers::health::metrics,
        crate::handlers::auth::signup_handler,
        crate::handlers::auth::login_handler,
        crate::handlers::auth::refresh_handler,
        crate::handlers::auth::logout_handler,
        crate::handlers::auth::me_handler,
        crate::handlers::auth::update_me_handler,
        crate::handlers::clients::create_client,
        crate::handlers::clients::list_clients,
        crate::handlers::clients::get_client,
        crate::handlers::clients::update_client,
        crate::handlers::clients::delete_client,
        crate::handlers::properties::create_property,
        crate::handlers::properties::list_properties,
        crate::handlers::properties::get_property,
        crate::handlers::properties::update_property,
        crate::handlers::properties::delete_property,
        crate::handlers::appointments::create_appointment,
        crate::handlers::appointments::list_appointments,
        crate::handlers::appointments::appointment_stats,
        crate::handlers::appointments::get_appointment,
        crate::handlers::appointments::update_appointment,
        crate::handlers::appointments::delete_appointment,
        crate::handlers::uploads::upload_profile_photo,
        crate::handlers::uploads::serve_upload,
        crate::handlers::dashboard::broker_dashboard,
        crate::handlers::dashboard::channel_partner_dashboard,
        crate::handlers::dashboard::admin_dashboard,
    ),
    components(schemas(
        crate::error::ApiError,
        crate::auth::AuthResponse,
        crate::handlers::health::HealthResponse,
        crate::handlers::health::ReadinessResponse,
        crate::handlers::health::MetricsResponse,
        crate::handlers::uploads::ProfilePhotoForm,
        crate::handlers::uploads::ProfilePhotoResponse,
        crate::handlers::dashboard::DashboardResponse,
        enfor_core::SignupRequest,
        enfor_core::LoginRequest,
        enfor_core::UpdateProfileRequest,
        enfor_core::PublicUser,
        enfor_core::UserRole,
        enfor_core::Client,
        enfor_core::ClientType,
        enfor_core::ClientStatus,
        enfor_core::CreateClientRequest,
        enfor_core::UpdateClientRequest,
        enfor_core::Property,
        enfor_core::PropertyType,
        enfor_core::ListingType,
        enfor_core::PropertyStatus,
        enfor_core::CreatePropertyRequest,
        enfor_core::UpdatePropertyRequest,
        enfor_core::Appointment,
        enfor_core::AppointmentType,
        enfor_core::AppointmentStatus,
        enfor_core::AppointmentStats,
        enfor_core::CreateAppointmentRequest,
        enfor_core::UpdateAppointmentRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness, readiness and counters"),
        (name = "auth", description = "Accounts and tokens"),
        (name = "clients", description = "Broker-owned clients"),
        (name = "properties", description = "Broker-owned property listings"),
        (name = "appointments", description = "Broker-owned appointments"),
        (name = "uploads", description = "Profile photos"),
        (name = "dashboards", description = "Role dashboards"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/auth/signup"));
        assert!(doc.paths.paths.contains_key("/api/appointments/{id}"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }

    #[test]
    fn test_upload_documented_as_multipart() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        let upload = &json["paths"]["/api/upload/profile-photo"]["post"];
        assert!(upload["requestBody"]["content"]
            .get("multipart/form-data")
            .is_some());
        assert!(json["components"]["schemas"]["ProfilePhotoForm"].is_object());
    }
}
