use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::owner_snapshot;
use crate::store::Storage;
use crate::{Client, CreateClientRequest, OwnedRepository, Result, UpdateClientRequest};

/// Client management for the owning broker
#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn Storage>,
    repo: OwnedRepository<dyn Storage>,
}

impl ClientService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            repo: OwnedRepository::new(Arc::clone(&store)),
            store,
        }
    }

    pub async fn create(&self, owner_id: Uuid, request: CreateClientRequest) -> Result<Client> {
        request.check_rules()?;
        let owner = owner_snapshot(&*self.store, owner_id).await?;
        let client = self
            .repo
            .create(owner_id, Client::new(request, owner_id, &owner))
            .await?;

        info!(client_id = %client.id, broker_id = %owner_id, "Client created");
        Ok(client)
    }

    /// Newest first
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Client>> {
        self.repo.list(owner_id).await
    }

    pub async fn get(&self, id: Uuid, owner_id: Uuid) -> Result<Client> {
        self.repo.get(id, owner_id).await
    }

    /// Partial update; appointment snapshots of the client follow in the same write.
    pub async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: UpdateClientRequest,
    ) -> Result<Client> {
        patch.check_rules()?;
        let client = self
            .repo
            .update(id, owner_id, move |client: &mut Client| {
                client.apply(patch);
                client.check_rules()
            })
            .await?;

        info!(client_id = %id, broker_id = %owner_id, "Client updated");
        Ok(client)
    }

    /// Removes the client and the appointments booked with it.
    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<()> {
        self.repo.delete::<Client>(id, owner_id).await?;
        info!(client_id = %id, broker_id = %owner_id, "Client deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::create_request;
    use crate::user::tests::broker;
    use crate::{CoreError, MemoryStore, UserStore};

    async fn service_with_broker() -> (ClientService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let user = broker("jane@example.com");
        store.create_user(&user).await.unwrap();
        (ClientService::new(store), user.id)
    }

    #[tokio::test]
    async fn test_create_snapshots_owner() {
        let (service, owner) = service_with_broker().await;
        let client = service.create(owner, create_request()).await.unwrap();
        assert_eq!(client.broker_id, owner);
        assert_eq!(client.broker_name.as_deref(), Some("Jane Doe"));
        assert_eq!(client.broker_city.as_deref(), Some("Mumbai"));
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_budget() {
        let (service, owner) = service_with_broker().await;
        let mut request = create_request();
        request.budget_min = Some(100.0);
        request.budget_max = Some(50.0);
        assert!(matches!(
            service.create(owner, request).await,
            Err(CoreError::Validation(_))
        ));
        assert!(service.list(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_owner_is_rejected() {
        let (service, _) = service_with_broker().await;
        assert!(matches!(
            service.create(Uuid::new_v4(), create_request()).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_is_partial_and_checked() {
        let (service, owner) = service_with_broker().await;
        let client = service.create(owner, create_request()).await.unwrap();

        let updated = service
            .update(
                client.id,
                owner,
                UpdateClientRequest {
                    notes: Some("Prefers weekends".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Prefers weekends"));
        assert_eq!(updated.email, client.email);

        let err = service
            .update(
                client.id,
                owner,
                UpdateClientRequest {
                    budget_min: Some(6000.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(err, Err(CoreError::Validation(_))));
        let stored = service.get(client.id, owner).await.unwrap();
        assert_eq!(stored.budget_min, Some(2000.0));
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let (service, owner) = service_with_broker().await;
        let first = service.create(owner, create_request()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = service.create(owner, create_request()).await.unwrap();

        let ids: Vec<_> = service
            .list(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
