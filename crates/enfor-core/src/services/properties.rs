use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::owner_snapshot;
use crate::store::Storage;
use crate::{CreatePropertyRequest, OwnedRepository, Property, Result, UpdatePropertyRequest};

/// Property listing management for the owning broker
#[derive(Clone)]
pub struct PropertyService {
    store: Arc<dyn Storage>,
    repo: OwnedRepository<dyn Storage>,
}

impl PropertyService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            repo: OwnedRepository::new(Arc::clone(&store)),
            store,
        }
    }

    pub async fn create(&self, owner_id: Uuid, request: CreatePropertyRequest) -> Result<Property> {
        request.check_rules()?;
        let owner = owner_snapshot(&*self.store, owner_id).await?;
        let property = self
            .repo
            .create(owner_id, Property::new(request, owner_id, &owner))
            .await?;

        info!(property_id = %property.id, broker_id = %owner_id, "Property created");
        Ok(property)
    }

    /// Newest first
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Property>> {
        self.repo.list(owner_id).await
    }

    pub async fn get(&self, id: Uuid, owner_id: Uuid) -> Result<Property> {
        self.repo.get(id, owner_id).await
    }

    /// Partial update. The room rule is checked against the merged listing,
    /// so switching a plot to a house requires room counts.
    pub async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: UpdatePropertyRequest,
    ) -> Result<Property> {
        patch.check_rules()?;
        let property = self
            .repo
            .update(id, owner_id, move |property: &mut Property| {
                property.apply(patch);
                property.check_rules()
            })
            .await?;

        info!(property_id = %id, broker_id = %owner_id, "Property updated");
        Ok(property)
    }

    /// Appointments that referenced the listing keep their client but lose the property link.
    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<()> {
        self.repo.delete::<Property>(id, owner_id).await?;
        info!(property_id = %id, broker_id = %owner_id, "Property deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::tests::create_request;
    use crate::user::tests::broker;
    use crate::{CoreError, MemoryStore, PropertyType, UserStore};

    async fn service_with_broker() -> (PropertyService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let user = broker("jane@example.com");
        store.create_user(&user).await.unwrap();
        (PropertyService::new(store), user.id)
    }

    #[tokio::test]
    async fn test_apartment_without_bedrooms_fails() {
        let (service, owner) = service_with_broker().await;
        let mut request = create_request(PropertyType::Apartment);
        request.bedrooms = None;
        assert!(matches!(
            service.create(owner, request).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_plot_without_bedrooms_succeeds() {
        let (service, owner) = service_with_broker().await;
        let mut request = create_request(PropertyType::Plot);
        request.bedrooms = None;
        request.bathrooms = None;
        let property = service.create(owner, request).await.unwrap();
        assert_eq!(property.bedrooms, None);
        assert_eq!(property.broker_name.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn test_update_to_house_requires_rooms() {
        let (service, owner) = service_with_broker().await;
        let mut request = create_request(PropertyType::Plot);
        request.bedrooms = None;
        request.bathrooms = None;
        let property = service.create(owner, request).await.unwrap();

        let result = service
            .update(
                property.id,
                owner,
                UpdatePropertyRequest {
                    property_type: Some(PropertyType::House),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(CoreError::Validation(_))));

        let updated = service
            .update(
                property.id,
                owner,
                UpdatePropertyRequest {
                    property_type: Some(PropertyType::House),
                    bedrooms: Some(4),
                    bathrooms: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.property_type, PropertyType::House);
    }

    #[tokio::test]
    async fn test_foreign_listing_is_not_found() {
        let (service, owner) = service_with_broker().await;
        let property = service
            .create(owner, create_request(PropertyType::House))
            .await
            .unwrap();
        let other = Uuid::new_v4();
        assert!(matches!(
            service.delete(property.id, other).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(service.get(property.id, owner).await.is_ok());
    }
}
