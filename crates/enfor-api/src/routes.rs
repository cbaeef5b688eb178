//! API route definitions

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use enfor_core::UserRole;

use crate::auth::middleware::{auth_middleware, optional_auth_middleware, require_role};
use crate::handlers::{appointments, auth, clients, dashboard, properties, uploads};
use crate::state::AppState;

const BROKER: &[UserRole] = &[UserRole::Broker];
const CHANNEL_PARTNER: &[UserRole] = &[UserRole::ChannelPartner];
const ADMIN: &[UserRole] = &[UserRole::Admin];

/// Multipart framing allowance on top of the file size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the `/api` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/uploads/:filename", get(uploads::serve_upload));

    // Logout accepts a token for the audit trail but never requires one
    let logout_route = Router::new()
        .route("/api/auth/logout", post(auth::logout_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let upload_limit = state.uploads.max_file_size() + MULTIPART_OVERHEAD;

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route(
            "/api/auth/me",
            get(auth::me_handler).put(auth::update_me_handler),
        )
        .route("/api/auth/refresh", post(auth::refresh_handler))
        // Clients
        .route(
            "/api/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/api/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        // Properties
        .route(
            "/api/properties",
            get(properties::list_properties).post(properties::create_property),
        )
        .route(
            "/api/properties/:id",
            get(properties::get_property)
                .put(properties::update_property)
                .delete(properties::delete_property),
        )
        // Appointments
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/api/appointments/stats",
            get(appointments::appointment_stats),
        )
        .route(
            "/api/appointments/:id",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        // Uploads
        .route(
            "/api/upload/profile-photo",
            post(uploads::upload_profile_photo).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(logout_route)
        .merge(protected_routes)
        .merge(role_route(
            "/api/broker/dashboard",
            BROKER,
            get(dashboard::broker_dashboard),
            &state,
        ))
        .merge(role_route(
            "/api/channel-partner/dashboard",
            CHANNEL_PARTNER,
            get(dashboard::channel_partner_dashboard),
            &state,
        ))
        .merge(role_route(
            "/api/admin/dashboard",
            ADMIN,
            get(dashboard::admin_dashboard),
            &state,
        ))
}

/// A single route gated on authentication and then on `roles`.
fn role_route(
    path: &str,
    roles: &'static [UserRole],
    handler: axum::routing::MethodRouter<Arc<AppState>>,
    state: &Arc<AppState>,
) -> Router<Arc<AppState>> {
    Router::new()
        .route(path, handler)
        .route_layer(middleware::from_fn(require_role(roles)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
}
