//! Authentication middleware for protecting routes
//!
//! [`auth_middleware`] validates the bearer token and binds an
//! [`AuthenticatedUser`] to the request; [`require_role`] is layered after it
//! on role-restricted routes; [`optional_auth_middleware`] binds the identity
//! when a valid token is present and otherwise lets the request through.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use enfor_core::UserRole;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::jwt::{validate_token, Claims, JwtError};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;

/// Identity bound to an authenticated request
///
/// Handlers extract it with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Authorization gate failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingAuthHeader,

    #[error("Authorization header must be in format: Bearer <token>")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("You don't have permission to access this resource")]
    InsufficientPermissions,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions => AppError::Forbidden(err.to_string()),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// Pull the bearer token out of the Authorization header.
fn bearer_token(request: &Request<Body>) -> Result<&str, AuthError> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Authentication middleware that requires a valid JWT
///
/// ```ignore
/// let protected = Router::new()
///     .route("/api/clients", get(list_clients))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = match bearer_token(&request)
        .and_then(|token| validate_token(state.auth.jwt_config(), token).map_err(AuthError::from))
    {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                path: request.uri().path().to_string(),
                reason: e.to_string(),
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
            });
            return Err(e);
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}

/// Like [`auth_middleware`], but requests without a usable token proceed
/// unauthenticated instead of being rejected.
pub async fn optional_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let claims = bearer_token(&request)
        .ok()
        .and_then(|token| validate_token(state.auth.jwt_config(), token).ok());

    if let Some(claims) = claims {
        request
            .extensions_mut()
            .insert(AuthenticatedUser::from(claims));
    }

    next.run(request).await
}

/// Type alias for role middleware future
type RoleMiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Middleware factory for role-based access control
///
/// Must run after [`auth_middleware`]. Requests whose bound role is not in
/// `allowed` are rejected with 403.
///
/// ```ignore
/// let admin = Router::new()
///     .route("/api/admin/dashboard", get(admin_dashboard))
///     .route_layer(middleware::from_fn(require_role(&[UserRole::Admin])));
/// ```
pub fn require_role(
    allowed: &'static [UserRole],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let user = request
                .extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(AuthError::MissingAuthHeader)?;

            if !user.has_any_role(allowed) {
                audit_log(&AuditEvent::AccessDenied {
                    user_id: user.user_id,
                    role: user.role,
                    path: request.uri().path().to_string(),
                    allowed_roles: allowed.to_vec(),
                    ip_address: extract_ip_address(request.headers()),
                });
                return Err(AuthError::InsufficientPermissions);
            }

            debug!(user_id = %user.user_id, role = %user.role, "Role check passed");
            Ok(next.run(request).await)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn request_with(header_value: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/clients");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_states() {
        assert!(matches!(
            bearer_token(&request_with(None)),
            Err(AuthError::MissingAuthHeader)
        ));
        assert!(matches!(
            bearer_token(&request_with(Some("Token abc"))),
            Err(AuthError::InvalidAuthHeader)
        ));
        assert!(matches!(
            bearer_token(&request_with(Some("Bearer "))),
            Err(AuthError::InvalidAuthHeader)
        ));
        assert_eq!(bearer_token(&request_with(Some("Bearer abc"))).unwrap(), "abc");
    }

    #[test]
    fn test_authenticated_user_from_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            email: "jane@example.com".to_string(),
            role: UserRole::ChannelPartner,
            iat: 1000,
            nbf: 1000,
            exp: 2000,
            iss: "enfor-data-backend".to_string(),
        };

        let user = AuthenticatedUser::from(claims);
        assert_eq!(user.user_id, user_id);
        assert!(user.has_any_role(&[UserRole::ChannelPartner, UserRole::Admin]));
        assert!(!user.has_any_role(&[UserRole::Broker]));
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            AuthError::MissingAuthHeader.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidToken(JwtError::Expired)
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InsufficientPermissions.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
