//! Authentication API handlers
//!
//! Signup, login, token refresh, logout and the caller's own profile.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Extension};
use enfor_core::{LoginRequest, PublicUser, SignupRequest, UpdateProfileRequest};

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{AuthResponse, AuthenticatedUser};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Register a new broker or channel partner account
///
/// Returns the new account together with a token, so the caller is signed in
/// immediately.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let email = request.email.clone();

    match state.auth.signup(request).await {
        Ok(response) => {
            audit_log(&AuditEvent::SignupSuccess {
                user_id: response.user.id,
                email: response.user.email.clone(),
                role: response.user.role,
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(ApiResponse::created("User registered successfully", response))
        }
        Err(e) => {
            audit_log(&AuditEvent::SignupFailure {
                email,
                reason: e.to_string(),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Err(e)
        }
    }
}

/// Login with email and password
///
/// Unknown emails, inactive accounts and wrong passwords all produce the same
/// 401 response.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let email = request.email.clone();

    match state.auth.login(request).await {
        Ok(response) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: response.user.id,
                email: response.user.email.clone(),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Ok(ApiResponse::ok("Login successful", response))
        }
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                email,
                reason: e.to_string(),
                ip_address: extract_ip_address(&headers),
                user_agent: extract_user_agent(&headers),
            });
            Err(e)
        }
    }
}

/// Issue a fresh token for the caller
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "Token refreshed successfully", body = AuthResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 404, description = "Account no longer exists", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let response = state.auth.refresh(user.user_id).await?;

    audit_log(&AuditEvent::TokenRefresh {
        user_id: user.user_id,
        email: response.user.email.clone(),
        ip_address: extract_ip_address(&headers),
    });

    Ok(ApiResponse::ok("Token refreshed successfully", response))
}

/// Logout
///
/// Tokens are stateless, so this only records the event; the client is
/// expected to discard its token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful"),
    )
)]
pub async fn logout_handler(
    user: Option<Extension<AuthenticatedUser>>,
    headers: HeaderMap,
) -> ApiResponse<()> {
    audit_log(&AuditEvent::Logout {
        user_id: user.map(|Extension(u)| u.user_id),
        ip_address: extract_ip_address(&headers),
    });

    ApiResponse::message("Logout successful")
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "User profile retrieved successfully", body = PublicUser),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let user = state.auth.get_user(user.user_id).await?;
    Ok(ApiResponse::ok(
        "User profile retrieved successfully",
        user.to_public(),
    ))
}

/// Update current user profile
///
/// Absent fields are left unchanged. A new name or city is copied onto every
/// client, property and appointment the caller owns.
#[utoipa::path(
    put,
    path = "/api/auth/me",
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated successfully", body = PublicUser),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(patch): ValidatedJson<UpdateProfileRequest>,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let user = state.auth.update_profile(user.user_id, patch).await?;
    Ok(ApiResponse::ok("Profile updated successfully", user.to_public()))
}
