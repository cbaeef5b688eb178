//! Enfor Core - Domain models, validation and storage
//!
//! This crate defines the shared building blocks of the brokerage backend:
//! - Users, clients, property listings and appointments
//! - Request validation rules
//! - Configuration management
//! - Storage traits with PostgreSQL and in-memory implementations
//! - Ownership-gated services for broker-owned resources

#[macro_use]
mod macros;

pub mod appointment;
pub mod client;
pub mod config;
pub mod ownership;
pub mod property;
pub mod services;
pub mod store;
pub mod user;
pub mod validation;

pub use appointment::{
    Appointment, AppointmentFilter, AppointmentStats, AppointmentStatus, AppointmentType,
    CreateAppointmentRequest, UpdateAppointmentRequest,
};
pub use client::{Client, ClientStatus, ClientType, CreateClientRequest, UpdateClientRequest};
pub use config::{
    AppConfig, ConfigError, DatabaseConfig, JwtSettings, LoggingConfig, ServerConfig,
    UploadConfig,
};
pub use ownership::OwnedRepository;
pub use property::{
    CreatePropertyRequest, ListingType, Property, PropertyStatus, PropertyType,
    UpdatePropertyRequest,
};
pub use services::{AppointmentService, ClientService, PropertyService};
pub use store::{
    memory::MemoryStore, postgres::PgStore, AppointmentStore, OwnedStore, Storage, UserStore,
};
pub use user::{
    LoginRequest, PublicUser, SignupRequest, UpdateProfileRequest, User, UserRole,
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for domain and storage operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// The record does not exist, or exists but belongs to another broker.
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("A user with this email already exists")]
    EmailExists,

    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn not_found(kind: &str) -> Self {
        Self::NotFound(kind.to_string())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

// ============================================================================
// Ownership
// ============================================================================

/// A record exclusively owned by one broker.
///
/// Every client, property and appointment carries the id of the user that
/// created it. Reads and writes through [`OwnedRepository`] compare this id
/// against the caller before touching the record.
pub trait OwnedEntity: Clone + Send + Sync + 'static {
    /// Human-readable kind used in error messages ("Client", "Property", ...).
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    fn owner_id(&self) -> Uuid;

    /// Stamp the record as modified.
    fn touch(&mut self, now: DateTime<Utc>);
}

/// Display name and city of a broker, copied onto owned records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerSnapshot {
    pub name: String,
    pub city: String,
}

impl From<&User> for OwnerSnapshot {
    fn from(user: &User) -> Self {
        Self {
            name: user.display_name(),
            city: user.city.clone(),
        }
    }
}
