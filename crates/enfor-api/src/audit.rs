//! Security audit logging for authentication events
//!
//! Every event is logged at INFO level with the "audit" target so it can be
//! filtered and routed separately from application logs, e.g.
//! `RUST_LOG=audit=info`. The serialized event travels in the `event` field.

use axum::http::{header, HeaderMap};
use enfor_core::UserRole;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    SignupSuccess {
        user_id: Uuid,
        email: String,
        role: UserRole,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    SignupFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    LoginSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// The reason is recorded here only; callers always see the same message.
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Missing, malformed or rejected bearer token
    InvalidToken {
        path: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Authenticated, but the role is not allowed on the route
    AccessDenied {
        user_id: Uuid,
        role: UserRole,
        path: String,
        allowed_roles: Vec<UserRole>,
        ip_address: Option<String>,
    },

    TokenRefresh {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
    },

    /// Advisory; the token stays valid until it expires
    Logout {
        user_id: Option<Uuid>,
        ip_address: Option<String>,
    },

    ProfilePhotoUploaded {
        user_id: Uuid,
        reference: String,
        size_bytes: usize,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::SignupSuccess { .. } => "Signup successful",
            AuditEvent::SignupFailure { .. } => "Signup failed",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::TokenRefresh { .. } => "Token refresh",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::ProfilePhotoUploaded { .. } => "Profile photo uploaded",
        }
    }

    fn user_id(&self) -> Option<Uuid> {
        match self {
            AuditEvent::SignupSuccess { user_id, .. }
            | AuditEvent::LoginSuccess { user_id, .. }
            | AuditEvent::AccessDenied { user_id, .. }
            | AuditEvent::TokenRefresh { user_id, .. }
            | AuditEvent::ProfilePhotoUploaded { user_id, .. } => Some(*user_id),
            AuditEvent::Logout { user_id, .. } => *user_id,
            _ => None,
        }
    }
}

/// Log a security audit event with structured fields
///
/// Example output field:
///
/// ```json
/// {"event_type":"login_success","user_id":"550e8400-e29b-41d4-a716-446655440000",
///  "email":"jane@example.com","ip_address":"203.0.113.1","user_agent":null}
/// ```
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event.user_id() {
        Some(user_id) => info!(
            target: "audit",
            event = %event_json,
            user_id = %user_id,
            "{}",
            event.summary()
        ),
        None => info!(target: "audit", event = %event_json, "{}", event.summary()),
    }
}

/// Client IP from proxy headers (X-Forwarded-For first hop, then X-Real-IP)
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
