//! In-process store
//!
//! All tables sit behind one lock, so every write (including snapshot
//! fan-out and delete cascades) is applied atomically with respect to readers.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::appointment::sort_chronologically;
use crate::store::{AppointmentStore, OwnedStore, Storage, UserStore};
use crate::{
    Appointment, AppointmentFilter, Client, CoreError, OwnedEntity, OwnerSnapshot, Property,
    Result, User,
};

/// Backing tables of [`MemoryStore`]
#[derive(Debug, Default)]
pub struct Tables {
    users: HashMap<Uuid, User>,
    clients: HashMap<Uuid, Client>,
    properties: HashMap<Uuid, Property>,
    appointments: HashMap<Uuid, Appointment>,
}

/// In-memory implementation of [`Storage`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Per-type table access and write hooks for [`MemoryStore`]
pub trait MemoryEntity: OwnedEntity {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self>;

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;

    /// Listing order
    fn sort(records: &mut [Self]);

    /// Propagate snapshot fields after the record changed.
    fn after_update(&self, _tables: &mut Tables) {}

    /// Apply referential actions after the record was removed.
    fn after_delete(&self, _tables: &mut Tables) {}
}

impl MemoryEntity for Client {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.clients
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.clients
    }

    fn sort(records: &mut [Self]) {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    fn after_update(&self, tables: &mut Tables) {
        for appointment in tables.appointments.values_mut() {
            if appointment.client_id == self.id {
                appointment.link_client(self);
            }
        }
    }

    fn after_delete(&self, tables: &mut Tables) {
        tables.appointments.retain(|_, a| a.client_id != self.id);
    }
}

impl MemoryEntity for Property {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.properties
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.properties
    }

    fn sort(records: &mut [Self]) {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    fn after_update(&self, tables: &mut Tables) {
        for appointment in tables.appointments.values_mut() {
            if appointment.property_id == Some(self.id) {
                appointment.link_property(Some(self));
            }
        }
    }

    fn after_delete(&self, tables: &mut Tables) {
        for appointment in tables.appointments.values_mut() {
            if appointment.property_id == Some(self.id) {
                appointment.link_property(None);
            }
        }
    }
}

impl MemoryEntity for Appointment {
    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.appointments
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.appointments
    }

    fn sort(records: &mut [Self]) {
        sort_chronologically(records);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn email_exists(&self, email: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.email == email))
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(CoreError::EmailExists);
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_active_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email == email && u.is_active)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.users.get_mut(&user.id) else {
            return Err(CoreError::not_found("User"));
        };
        *stored = user.clone();

        let snapshot = OwnerSnapshot::from(user);
        for client in tables.clients.values_mut().filter(|c| c.broker_id == user.id) {
            client.broker_name = Some(snapshot.name.clone());
            client.broker_city = Some(snapshot.city.clone());
        }
        for property in tables
            .properties
            .values_mut()
            .filter(|p| p.broker_id == user.id)
        {
            property.broker_name = Some(snapshot.name.clone());
            property.broker_city = Some(snapshot.city.clone());
        }
        for appointment in tables
            .appointments
            .values_mut()
            .filter(|a| a.broker_id == user.id)
        {
            appointment.broker_name = Some(snapshot.name.clone());
            appointment.broker_city = Some(snapshot.city.clone());
        }
        Ok(())
    }

    async fn set_profile_image(&self, id: Uuid, reference: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.profile_image = Some(reference.to_string());
                user.updated_at = chrono::Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl<T: MemoryEntity> OwnedStore<T> for MemoryStore {
    async fn insert(&self, entity: &T) -> Result<()> {
        let mut tables = self.tables.write().await;
        T::table_mut(&mut tables).insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<T>> {
        let tables = self.tables.read().await;
        Ok(T::table(&tables).get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<T>> {
        let tables = self.tables.read().await;
        let mut records: Vec<T> = T::table(&tables)
            .values()
            .filter(|r| r.owner_id() == owner_id)
            .cloned()
            .collect();
        T::sort(&mut records);
        Ok(records)
    }

    async fn update(&self, entity: &T) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match T::table_mut(&mut tables).get_mut(&entity.id()) {
            Some(stored) => *stored = entity.clone(),
            None => return Ok(false),
        }
        entity.after_update(&mut tables);
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match T::table_mut(&mut tables).remove(&id) {
            Some(removed) => {
                removed.after_delete(&mut tables);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn list_appointments(
        &self,
        owner_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut records: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.broker_id == owner_id && filter.matches(a))
            .cloned()
            .collect();
        sort_chronologically(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
