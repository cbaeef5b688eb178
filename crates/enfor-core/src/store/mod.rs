//! Storage traits
//!
//! Two implementations exist: [`postgres::PgStore`] for deployments and
//! [`memory::MemoryStore`] for tests and local development. Both keep the
//! denormalized snapshots on owned records in step with their sources inside
//! the same write that changes the source.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{Appointment, AppointmentFilter, Client, OwnedEntity, Property, Result, User};

/// User account persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Whether any account (active or not) uses this email
    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Insert a new account. Fails with `EmailExists` when the email is taken.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Look up an active account by its normalised email
    async fn find_active_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Persist profile changes and refresh `broker_name` / `broker_city` on
    /// every client, property and appointment the user owns, atomically.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Record a new profile photo reference. Returns false if the user is gone.
    async fn set_profile_image(&self, id: Uuid, reference: &str) -> Result<bool>;
}

/// Persistence for a broker-owned record type.
///
/// `get` looks up by id alone; ownership is decided by the caller (see
/// [`crate::OwnedRepository`]).
#[async_trait]
pub trait OwnedStore<T: OwnedEntity>: Send + Sync {
    async fn insert(&self, entity: &T) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<T>>;

    /// All records owned by `owner_id`, in the listing order of the type
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<T>>;

    /// Replace the stored record. Snapshots derived from it on other records
    /// are refreshed in the same write. Returns false if the record is gone.
    async fn update(&self, entity: &T) -> Result<bool>;

    /// Returns false if the record was already gone.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Appointment queries beyond plain ownership listing
#[async_trait]
pub trait AppointmentStore: OwnedStore<Appointment> {
    /// Owner's appointments matching every set filter, ascending by date then time
    async fn list_appointments(
        &self,
        owner_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>>;
}

/// Everything the services need from a backing store
#[async_trait]
pub trait Storage:
    UserStore + OwnedStore<Client> + OwnedStore<Property> + AppointmentStore + Send + Sync
{
    /// Cheap round trip used by readiness checks
    async fn ping(&self) -> Result<()>;
}
