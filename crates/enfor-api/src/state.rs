//! Application state management

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use enfor_core::{
    AppConfig, AppointmentService, ClientService, ConfigError, MemoryStore, PropertyService,
    Storage,
};

use crate::auth::{AuthService, JwtConfig, PasswordConfig};
use crate::uploads::UploadStore;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Backing store, kept for readiness checks
    pub store: Arc<dyn Storage>,
    pub auth: AuthService,
    pub clients: ClientService,
    pub properties: PropertyService,
    pub appointments: AppointmentService,
    pub uploads: UploadStore,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
}

impl AppState {
    /// Wire the services over `store`.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Storage>,
        password: PasswordConfig,
    ) -> Result<Self, ConfigError> {
        let jwt = JwtConfig::from_settings(&config.jwt)?;

        Ok(Self {
            auth: AuthService::new(Arc::clone(&store), jwt, password),
            clients: ClientService::new(Arc::clone(&store)),
            properties: PropertyService::new(Arc::clone(&store)),
            appointments: AppointmentService::new(Arc::clone(&store)),
            uploads: UploadStore::new(&config.upload),
            store,
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        })
    }

    /// State over a fresh in-memory store with cheap password hashing and a
    /// throwaway upload directory.
    pub fn for_testing() -> Self {
        let mut config = AppConfig::default();
        config.upload.path =
            std::env::temp_dir().join(format!("enfor-test-uploads-{}", uuid::Uuid::new_v4()));

        let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        let jwt = JwtConfig::default();

        Self {
            auth: AuthService::new(Arc::clone(&store), jwt, PasswordConfig::light()),
            clients: ClientService::new(Arc::clone(&store)),
            properties: PropertyService::new(Arc::clone(&store)),
            appointments: AppointmentService::new(Arc::clone(&store)),
            uploads: UploadStore::new(&config.upload),
            store,
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
