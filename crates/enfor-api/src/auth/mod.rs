//! Authentication and authorization module
//!
//! This module provides JWT-based authentication with the following components:
//! - Token issuing and validation
//! - Password hashing with Argon2id
//! - Middleware binding the caller's identity and checking roles
//! - Authentication service for signup, login, refresh and profiles

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{issue_token, validate_token, Claims, JwtConfig, JwtError};
pub use middleware::{
    auth_middleware, optional_auth_middleware, require_role, AuthError, AuthenticatedUser,
};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service::{AuthResponse, AuthService};
