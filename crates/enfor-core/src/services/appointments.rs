use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::owner_snapshot;
use crate::appointment::PropertyLink;
use crate::store::{AppointmentStore, OwnedStore, Storage};
use crate::{
    Appointment, AppointmentFilter, AppointmentStats, Client, CoreError, CreateAppointmentRequest,
    OwnedEntity, OwnedRepository, Property, Result, UpdateAppointmentRequest,
};

/// Appointment scheduling for the owning broker
#[derive(Clone)]
pub struct AppointmentService {
    store: Arc<dyn Storage>,
    repo: OwnedRepository<dyn Storage>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self {
            repo: OwnedRepository::new(Arc::clone(&store)),
            store,
        }
    }

    /// Resolve a referenced record that must belong to the same broker.
    async fn resolve<T>(&self, id: Uuid, owner_id: Uuid, field: &str) -> Result<T>
    where
        T: OwnedEntity,
        dyn Storage: OwnedStore<T>,
    {
        self.repo.get::<T>(id, owner_id).await.map_err(|e| match e {
            CoreError::NotFound(_) => {
                warn!(%owner_id, %id, field, "Rejected appointment reference");
                CoreError::InvalidReference(format!(
                    "{field} does not refer to one of your {} records",
                    T::KIND.to_lowercase()
                ))
            }
            other => other,
        })
    }

    /// Book an appointment. Client and property references are checked
    /// before anything is written.
    pub async fn create(
        &self,
        owner_id: Uuid,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment> {
        let client: Client = self.resolve(request.client_id, owner_id, "client_id").await?;
        let property: Option<Property> = match request.property_id {
            Some(id) => Some(self.resolve(id, owner_id, "property_id").await?),
            None => None,
        };

        let owner = owner_snapshot(&*self.store, owner_id).await?;
        let appointment = Appointment::new(request, owner_id, &owner, &client, property.as_ref());
        let appointment = self.repo.create(owner_id, appointment).await?;

        info!(
            appointment_id = %appointment.id,
            broker_id = %owner_id,
            client_id = %client.id,
            "Appointment created"
        );
        Ok(appointment)
    }

    /// Filtered listing, ascending by date then time
    pub async fn list(
        &self,
        owner_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>> {
        filter.check_rules()?;
        self.store.list_appointments(owner_id, filter).await
    }

    pub async fn get(&self, id: Uuid, owner_id: Uuid) -> Result<Appointment> {
        self.repo.get(id, owner_id).await
    }

    /// Partial update. A new client or property reference is verified before
    /// the appointment is touched; the snapshots follow the new references.
    pub async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: UpdateAppointmentRequest,
    ) -> Result<Appointment> {
        // Ownership of the appointment itself is decided first.
        self.repo.get::<Appointment>(id, owner_id).await?;

        let client: Option<Client> = match patch.client_id {
            Some(client_id) => Some(self.resolve(client_id, owner_id, "client_id").await?),
            None => None,
        };
        let property: Option<Option<Property>> = match patch.property_id {
            Some(PropertyLink::Set(property_id)) => {
                Some(Some(self.resolve(property_id, owner_id, "property_id").await?))
            }
            Some(PropertyLink::Clear) => Some(None),
            None => None,
        };

        let appointment = self
            .repo
            .update(id, owner_id, move |appointment: &mut Appointment| {
                appointment.apply(&patch);
                if let Some(client) = &client {
                    appointment.link_client(client);
                }
                if let Some(property) = &property {
                    appointment.link_property(property.as_ref());
                }
                Ok(())
            })
            .await?;

        info!(appointment_id = %id, broker_id = %owner_id, "Appointment updated");
        Ok(appointment)
    }

    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<()> {
        self.repo.delete::<Appointment>(id, owner_id).await?;
        info!(appointment_id = %id, broker_id = %owner_id, "Appointment deleted");
        Ok(())
    }

    /// Counters relative to today's date (UTC)
    pub async fn stats(&self, owner_id: Uuid) -> Result<AppointmentStats> {
        self.stats_on(owner_id, Utc::now().date_naive()).await
    }

    pub async fn stats_on(&self, owner_id: Uuid, today: NaiveDate) -> Result<AppointmentStats> {
        let appointments = self
            .store
            .list_appointments(owner_id, &AppointmentFilter::default())
            .await?;
        Ok(AppointmentStats::compute(&appointments, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::create_request as client_request;
    use crate::property::tests::create_request as property_request;
    use crate::user::tests::broker;
    use crate::{
        AppointmentStatus, AppointmentType, ClientService, MemoryStore, PropertyService,
        PropertyType, UpdateClientRequest, UpdateProfileRequest, UserStore,
    };
    use chrono::NaiveTime;

    struct Fixture {
        store: Arc<MemoryStore>,
        clients: ClientService,
        properties: PropertyService,
        appointments: AppointmentService,
        broker_a: Uuid,
        broker_b: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let a = broker("a@example.com");
        let mut b = broker("b@example.com");
        b.first_name = "Bob".to_string();
        store.create_user(&a).await.unwrap();
        store.create_user(&b).await.unwrap();

        let dyn_store: Arc<dyn Storage> = store.clone();
        Fixture {
            clients: ClientService::new(Arc::clone(&dyn_store)),
            properties: PropertyService::new(Arc::clone(&dyn_store)),
            appointments: AppointmentService::new(dyn_store),
            store,
            broker_a: a.id,
            broker_b: b.id,
        }
    }

    fn request(client_id: Uuid, property_id: Option<Uuid>) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            title: "Site visit".to_string(),
            description: Some("Bring keys".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            time: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
            client_id,
            property_id,
            appointment_type: AppointmentType::SiteVisit,
        }
    }

    #[tokio::test]
    async fn test_create_with_own_references() {
        let f = fixture().await;
        let client = f.clients.create(f.broker_a, client_request()).await.unwrap();
        let property = f
            .properties
            .create(f.broker_a, property_request(PropertyType::House))
            .await
            .unwrap();

        let appointment = f
            .appointments
            .create(f.broker_a, request(client.id, Some(property.id)))
            .await
            .unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(appointment.client_name.as_deref(), Some("Ravi Kumar"));
        assert_eq!(
            appointment.property_address.as_deref(),
            Some(property.address.as_str())
        );
    }

    #[tokio::test]
    async fn test_foreign_client_is_invalid_reference() {
        let f = fixture().await;
        let foreign = f.clients.create(f.broker_b, client_request()).await.unwrap();

        let result = f
            .appointments
            .create(f.broker_a, request(foreign.id, None))
            .await;
        assert!(matches!(result, Err(CoreError::InvalidReference(_))));

        let listed = f
            .appointments
            .list(f.broker_a, &AppointmentFilter::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_property_is_invalid_reference() {
        let f = fixture().await;
        let client = f.clients.create(f.broker_a, client_request()).await.unwrap();
        let foreign = f
            .properties
            .create(f.broker_b, property_request(PropertyType::House))
            .await
            .unwrap();

        let result = f
            .appointments
            .create(f.broker_a, request(client.id, Some(foreign.id)))
            .await;
        assert!(matches!(result, Err(CoreError::InvalidReference(_))));
    }

    #[tokio::test]
    async fn test_update_relinks_and_clears_property() {
        let f = fixture().await;
        let client = f.clients.create(f.broker_a, client_request()).await.unwrap();
        let property = f
            .properties
            .create(f.broker_a, property_request(PropertyType::House))
            .await
            .unwrap();
        let appointment = f
            .appointments
            .create(f.broker_a, request(client.id, None))
            .await
            .unwrap();

        let linked = f
            .appointments
            .update(
                appointment.id,
                f.broker_a,
                UpdateAppointmentRequest {
                    property_id: Some(PropertyLink::Set(property.id)),
                    status: Some(AppointmentStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(linked.property_id, Some(property.id));
        assert_eq!(linked.status, AppointmentStatus::Completed);

        let cleared = f
            .appointments
            .update(
                appointment.id,
                f.broker_a,
                UpdateAppointmentRequest {
                    property_id: Some(PropertyLink::Clear),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.property_id.is_none());
        assert!(cleared.property_address.is_none());
    }

    #[tokio::test]
    async fn test_update_to_foreign_client_changes_nothing() {
        let f = fixture().await;
        let client = f.clients.create(f.broker_a, client_request()).await.unwrap();
        let foreign = f.clients.create(f.broker_b, client_request()).await.unwrap();
        let appointment = f
            .appointments
            .create(f.broker_a, request(client.id, None))
            .await
            .unwrap();

        let result = f
            .appointments
            .update(
                appointment.id,
                f.broker_a,
                UpdateAppointmentRequest {
                    client_id: Some(foreign.id),
                    title: Some("Hijacked title".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(CoreError::InvalidReference(_))));

        let stored = f.appointments.get(appointment.id, f.broker_a).await.unwrap();
        assert_eq!(stored.client_id, client.id);
        assert_eq!(stored.title, "Site visit");
    }

    #[tokio::test]
    async fn test_other_broker_cannot_touch_appointment() {
        let f = fixture().await;
        let client = f.clients.create(f.broker_a, client_request()).await.unwrap();
        let appointment = f
            .appointments
            .create(f.broker_a, request(client.id, None))
            .await
            .unwrap();

        assert!(matches!(
            f.appointments.get(appointment.id, f.broker_b).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            f.appointments
                .update(appointment.id, f.broker_b, UpdateAppointmentRequest::default())
                .await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            f.appointments.delete(appointment.id, f.broker_b).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshots_follow_sources() {
        let f = fixture().await;
        let client = f.clients.create(f.broker_a, client_request()).await.unwrap();
        let appointment = f
            .appointments
            .create(f.broker_a, request(client.id, None))
            .await
            .unwrap();

        f.clients
            .update(
                client.id,
                f.broker_a,
                UpdateClientRequest {
                    first_name: Some("Rahul".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut user = f.store.find_user_by_id(f.broker_a).await.unwrap().unwrap();
        user.apply_profile(UpdateProfileRequest {
            first_name: Some("Janet".to_string()),
            ..Default::default()
        });
        f.store.update_user(&user).await.unwrap();

        let stored = f.appointments.get(appointment.id, f.broker_a).await.unwrap();
        assert_eq!(stored.client_name.as_deref(), Some("Rahul Kumar"));
        assert_eq!(stored.broker_name.as_deref(), Some("Janet Doe"));
        let client = f.clients.get(client.id, f.broker_a).await.unwrap();
        assert_eq!(client.broker_name.as_deref(), Some("Janet Doe"));
    }

    #[tokio::test]
    async fn test_stats_are_owner_scoped() {
        let f = fixture().await;
        let client_a = f.clients.create(f.broker_a, client_request()).await.unwrap();
        let client_b = f.clients.create(f.broker_b, client_request()).await.unwrap();
        f.appointments
            .create(f.broker_a, request(client_a.id, None))
            .await
            .unwrap();
        f.appointments
            .create(f.broker_b, request(client_b.id, None))
            .await
            .unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let stats = f.appointments.stats_on(f.broker_a, today).await.unwrap();
        assert_eq!(stats.total_this_month, 1);
        assert_eq!(stats.today_appointments, 1);
        assert_eq!(stats.scheduled_appointments, 1);
        assert_eq!(stats.appointments_by_type.get("site_visit"), Some(&1));
    }

    #[tokio::test]
    async fn test_invalid_date_range() {
        let f = fixture().await;
        let filter = AppointmentFilter {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 20),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..Default::default()
        };
        assert!(matches!(
            f.appointments.list(f.broker_a, &filter).await,
            Err(CoreError::Validation(_))
        ));
    }
}
