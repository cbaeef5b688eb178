//! Ownership-gated operations on clients, properties and appointments
//!
//! Each operation takes the caller's user id explicitly; nothing is read from
//! ambient request state.

mod appointments;
mod clients;
mod properties;

pub use appointments::AppointmentService;
pub use clients::ClientService;
pub use properties::PropertyService;

use uuid::Uuid;

use crate::store::{Storage, UserStore};
use crate::{CoreError, OwnerSnapshot, Result};

/// Name and city of the acting broker, copied onto records they create.
async fn owner_snapshot(store: &dyn Storage, owner_id: Uuid) -> Result<OwnerSnapshot> {
    store
        .find_user_by_id(owner_id)
        .await?
        .map(|user| OwnerSnapshot::from(&user))
        .ok_or_else(|| CoreError::not_found("User"))
}
