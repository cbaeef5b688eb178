//! Ownership-gated access to broker-owned records
//!
//! Every read, update and delete of a client, property or appointment goes
//! through [`OwnedRepository`]. The record is fetched by id alone and its
//! owner compared with the caller; a missing record and a record owned by
//! someone else produce the same `NotFound`, so callers cannot probe for
//! other brokers' data.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::store::OwnedStore;
use crate::{CoreError, OwnedEntity, Result};

/// Generic owner-checked repository over any store implementing
/// [`OwnedStore`] for the requested record type.
pub struct OwnedRepository<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for OwnedRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ?Sized + Send + Sync> OwnedRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Insert a record created on behalf of `owner_id`.
    pub async fn create<T>(&self, owner_id: Uuid, entity: T) -> Result<T>
    where
        T: OwnedEntity,
        S: OwnedStore<T>,
    {
        if entity.owner_id() != owner_id {
            return Err(CoreError::Other(anyhow::anyhow!(
                "{} created for a different owner",
                T::KIND
            )));
        }
        OwnedStore::<T>::insert(&*self.store, &entity).await?;
        Ok(entity)
    }

    /// Fetch a record the caller owns.
    pub async fn get<T>(&self, id: Uuid, owner_id: Uuid) -> Result<T>
    where
        T: OwnedEntity,
        S: OwnedStore<T>,
    {
        match OwnedStore::<T>::get(&*self.store, id).await? {
            Some(entity) if entity.owner_id() == owner_id => Ok(entity),
            Some(_) => {
                debug!(kind = T::KIND, %id, %owner_id, "Ownership mismatch");
                Err(CoreError::not_found(T::KIND))
            }
            None => Err(CoreError::not_found(T::KIND)),
        }
    }

    pub async fn list<T>(&self, owner_id: Uuid) -> Result<Vec<T>>
    where
        T: OwnedEntity,
        S: OwnedStore<T>,
    {
        OwnedStore::<T>::list_by_owner(&*self.store, owner_id).await
    }

    /// Fetch an owned record, let `mutate` change it, and store the result.
    ///
    /// `mutate` runs after the ownership check and before any write; an error
    /// from it aborts the update with nothing persisted.
    pub async fn update<T, F>(&self, id: Uuid, owner_id: Uuid, mutate: F) -> Result<T>
    where
        T: OwnedEntity,
        S: OwnedStore<T>,
        F: FnOnce(&mut T) -> Result<()> + Send,
    {
        let mut entity: T = self.get(id, owner_id).await?;
        mutate(&mut entity)?;
        entity.touch(Utc::now());

        if !OwnedStore::<T>::update(&*self.store, &entity).await? {
            return Err(CoreError::not_found(T::KIND));
        }
        Ok(entity)
    }

    pub async fn delete<T>(&self, id: Uuid, owner_id: Uuid) -> Result<()>
    where
        T: OwnedEntity,
        S: OwnedStore<T>,
    {
        let entity: T = self.get(id, owner_id).await?;
        if !OwnedStore::<T>::delete(&*self.store, entity.id()).await? {
            return Err(CoreError::not_found(T::KIND));
        }
        Ok(())
    }
}
