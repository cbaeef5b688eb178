//! PostgreSQL store
//!
//! Snapshot fan-out and referential clean-up run in the same transaction as
//! the write that triggers them.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::store::{AppointmentStore, OwnedStore, Storage, UserStore};
use crate::{
    Appointment, AppointmentFilter, Client, CoreError, OwnerSnapshot, Property, Result, User,
};

/// PostgreSQL-backed [`Storage`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a connection pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_url())
            .await
            .map_err(|e| CoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::Database(format!("Migration failed: {e}")))
    }
}

fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> CoreError {
    move |e| CoreError::Database(format!("{context}: {e}"))
}

/// Share-lock a referenced client or property row until the transaction ends
/// and check that it belongs to `owner_id`.
async fn lock_reference(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    field: &'static str,
    id: Uuid,
    owner_id: Uuid,
) -> Result<()> {
    let sql = format!("SELECT broker_id FROM {table} WHERE id = $1 FOR SHARE");
    let row: Option<(Uuid,)> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err("Failed to check reference"))?;

    match row {
        Some((broker_id,)) if broker_id == owner_id => Ok(()),
        _ => Err(CoreError::InvalidReference(format!(
            "{field} does not refer to one of your {table}"
        ))),
    }
}

/// Lock both references of an appointment inside `tx`.
async fn lock_appointment_references(
    tx: &mut Transaction<'_, Postgres>,
    a: &Appointment,
) -> Result<()> {
    lock_reference(tx, "clients", "client_id", a.client_id, a.broker_id).await?;
    if let Some(property_id) = a.property_id {
        lock_reference(tx, "properties", "property_id", property_id, a.broker_id).await?;
    }
    Ok(())
}

// ============================================================================
// Rows
// ============================================================================

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, date_of_birth, \
     firm_name, role, whatsapp_number, alternative_number, foreign_number, address, location, \
     city, state, postal_code, profile_image, is_verified, is_active, created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    date_of_birth: Option<NaiveDate>,
    firm_name: String,
    role: String,
    whatsapp_number: String,
    alternative_number: Option<String>,
    foreign_number: Option<String>,
    address: String,
    location: String,
    city: String,
    state: String,
    postal_code: String,
    profile_image: Option<String>,
    is_verified: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            date_of_birth: row.date_of_birth,
            firm_name: row.firm_name,
            role: row.role.parse().unwrap_or_default(),
            whatsapp_number: row.whatsapp_number,
            alternative_number: row.alternative_number,
            foreign_number: row.foreign_number,
            address: row.address,
            location: row.location,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            profile_image: row.profile_image,
            is_verified: row.is_verified,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CLIENT_COLUMNS: &str = "id, first_name, last_name, email, phone, type, status, budget_min, \
     budget_max, preferred_location, address, city, state, postal_code, requirements, notes, \
     broker_id, broker_name, broker_city, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ClientRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    #[sqlx(rename = "type")]
    client_type: String,
    status: String,
    budget_min: Option<f64>,
    budget_max: Option<f64>,
    preferred_location: String,
    address: String,
    city: String,
    state: String,
    postal_code: String,
    requirements: String,
    notes: Option<String>,
    broker_id: Uuid,
    broker_name: Option<String>,
    broker_city: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            client_type: row.client_type.parse().unwrap_or_default(),
            status: row.status.parse().unwrap_or_default(),
            budget_min: row.budget_min,
            budget_max: row.budget_max,
            preferred_location: row.preferred_location,
            address: row.address,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            requirements: row.requirements,
            notes: row.notes,
            broker_id: row.broker_id,
            broker_name: row.broker_name,
            broker_city: row.broker_city,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PROPERTY_COLUMNS: &str = "id, title, type, listing_type, price, area, bedrooms, bathrooms, \
     location, address, city, state, description, amenities, status, broker_id, broker_name, \
     broker_city, created_at, updated_at";

#[derive(Debug, FromRow)]
struct PropertyRow {
    id: Uuid,
    title: String,
    #[sqlx(rename = "type")]
    property_type: String,
    listing_type: String,
    price: f64,
    area: f64,
    bedrooms: Option<i32>,
    bathrooms: Option<i32>,
    location: String,
    address: String,
    city: String,
    state: String,
    description: String,
    amenities: Vec<String>,
    status: String,
    broker_id: Uuid,
    broker_name: Option<String>,
    broker_city: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PropertyRow> for Property {
    fn from(row: PropertyRow) -> Self {
        Property {
            id: row.id,
            title: row.title,
            property_type: row.property_type.parse().unwrap_or_default(),
            listing_type: row.listing_type.parse().unwrap_or_default(),
            price: row.price,
            area: row.area,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            location: row.location,
            address: row.address,
            city: row.city,
            state: row.state,
            description: row.description,
            amenities: row.amenities,
            status: row.status.parse().unwrap_or_default(),
            broker_id: row.broker_id,
            broker_name: row.broker_name,
            broker_city: row.broker_city,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const APPOINTMENT_COLUMNS: &str = "id, title, description, date, time, client_id, property_id, \
     broker_id, type, status, client_name, client_phone, property_address, broker_name, \
     broker_city, created_at, updated_at";

#[derive(Debug, FromRow)]
struct AppointmentRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    date: NaiveDate,
    time: NaiveTime,
    client_id: Uuid,
    property_id: Option<Uuid>,
    broker_id: Uuid,
    #[sqlx(rename = "type")]
    appointment_type: String,
    status: String,
    client_name: Option<String>,
    client_phone: Option<String>,
    property_address: Option<String>,
    broker_name: Option<String>,
    broker_city: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: row.id,
            title: row.title,
            description: row.description,
            date: row.date,
            time: row.time,
            client_id: row.client_id,
            property_id: row.property_id,
            broker_id: row.broker_id,
            appointment_type: row.appointment_type.parse().unwrap_or_default(),
            status: row.status.parse().unwrap_or_default(),
            client_name: row.client_name,
            client_phone: row.client_phone,
            property_address: row.property_address,
            broker_name: row.broker_name,
            broker_city: row.broker_city,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ============================================================================
// Users
// ============================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn email_exists(&self, email: &str) -> Result<bool> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err("Failed to check email"))?;
        Ok(row.0)
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, \
             $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)"
        );
        sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.date_of_birth)
            .bind(&user.firm_name)
            .bind(user.role.as_str())
            .bind(&user.whatsapp_number)
            .bind(&user.alternative_number)
            .bind(&user.foreign_number)
            .bind(&user.address)
            .bind(&user.location)
            .bind(&user.city)
            .bind(&user.state)
            .bind(&user.postal_code)
            .bind(&user.profile_image)
            .bind(user.is_verified)
            .bind(user.is_active)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => CoreError::EmailExists,
                e => CoreError::Database(format!("Failed to create user: {e}")),
            })?;
        Ok(())
    }

    async fn find_active_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1) AND is_active = TRUE"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find user"))?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get user"))?;
        Ok(row.map(Into::into))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE users SET
                first_name = $2, last_name = $3, firm_name = $4, whatsapp_number = $5,
                alternative_number = $6, foreign_number = $7, address = $8, location = $9,
                city = $10, state = $11, postal_code = $12, profile_image = $13,
                is_verified = $14, is_active = $15, updated_at = $16
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.firm_name)
        .bind(&user.whatsapp_number)
        .bind(&user.alternative_number)
        .bind(&user.foreign_number)
        .bind(&user.address)
        .bind(&user.location)
        .bind(&user.city)
        .bind(&user.state)
        .bind(&user.postal_code)
        .bind(&user.profile_image)
        .bind(user.is_verified)
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to update user"))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("User"));
        }

        let snapshot = OwnerSnapshot::from(user);
        for table in ["clients", "properties", "appointments"] {
            let sql = format!(
                "UPDATE {table} SET broker_name = $2, broker_city = $3 WHERE broker_id = $1"
            );
            let updated = sqlx::query(&sql)
                .bind(user.id)
                .bind(&snapshot.name)
                .bind(&snapshot.city)
                .execute(&mut *tx)
                .await
                .map_err(db_err("Failed to refresh broker snapshot"))?;
            debug!(table, rows = updated.rows_affected(), "Refreshed broker snapshot");
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit user update"))
    }

    async fn set_profile_image(&self, id: Uuid, reference: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET profile_image = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(reference)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to update profile image"))?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Clients
// ============================================================================

#[async_trait]
impl OwnedStore<Client> for PgStore {
    async fn insert(&self, c: &Client) -> Result<()> {
        let sql = format!(
            "INSERT INTO clients ({CLIENT_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, \
             $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)"
        );
        sqlx::query(&sql)
            .bind(c.id)
            .bind(&c.first_name)
            .bind(&c.last_name)
            .bind(&c.email)
            .bind(&c.phone)
            .bind(c.client_type.as_str())
            .bind(c.status.as_str())
            .bind(c.budget_min)
            .bind(c.budget_max)
            .bind(&c.preferred_location)
            .bind(&c.address)
            .bind(&c.city)
            .bind(&c.state)
            .bind(&c.postal_code)
            .bind(&c.requirements)
            .bind(&c.notes)
            .bind(c.broker_id)
            .bind(&c.broker_name)
            .bind(&c.broker_city)
            .bind(c.created_at)
            .bind(c.updated_at)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to create client"))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1");
        let row: Option<ClientRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get client"))?;
        Ok(row.map(Into::into))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE broker_id = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<ClientRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list clients"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, c: &Client) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE clients SET
                first_name = $2, last_name = $3, email = $4, phone = $5, type = $6, status = $7,
                budget_min = $8, budget_max = $9, preferred_location = $10, address = $11,
                city = $12, state = $13, postal_code = $14, requirements = $15, notes = $16,
                updated_at = $17
            WHERE id = $1
            "#,
        )
        .bind(c.id)
        .bind(&c.first_name)
        .bind(&c.last_name)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(c.client_type.as_str())
        .bind(c.status.as_str())
        .bind(c.budget_min)
        .bind(c.budget_max)
        .bind(&c.preferred_location)
        .bind(&c.address)
        .bind(&c.city)
        .bind(&c.state)
        .bind(&c.postal_code)
        .bind(&c.requirements)
        .bind(&c.notes)
        .bind(c.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to update client"))?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE appointments SET client_name = $2, client_phone = $3 WHERE client_id = $1",
        )
        .bind(c.id)
        .bind(c.display_name())
        .bind(&c.phone)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to refresh client snapshot"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit client update"))?;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        // Appointments referencing the client go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to delete client"))?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Properties
// ============================================================================

#[async_trait]
impl OwnedStore<Property> for PgStore {
    async fn insert(&self, p: &Property) -> Result<()> {
        let sql = format!(
            "INSERT INTO properties ({PROPERTY_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, \
             $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"
        );
        sqlx::query(&sql)
            .bind(p.id)
            .bind(&p.title)
            .bind(p.property_type.as_str())
            .bind(p.listing_type.as_str())
            .bind(p.price)
            .bind(p.area)
            .bind(p.bedrooms)
            .bind(p.bathrooms)
            .bind(&p.location)
            .bind(&p.address)
            .bind(&p.city)
            .bind(&p.state)
            .bind(&p.description)
            .bind(&p.amenities)
            .bind(p.status.as_str())
            .bind(p.broker_id)
            .bind(&p.broker_name)
            .bind(&p.broker_city)
            .bind(p.created_at)
            .bind(p.updated_at)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to create property"))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Property>> {
        let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1");
        let row: Option<PropertyRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get property"))?;
        Ok(row.map(Into::into))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Property>> {
        let sql = format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties \
             WHERE broker_id = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<PropertyRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list properties"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, p: &Property) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE properties SET
                title = $2, type = $3, listing_type = $4, price = $5, area = $6, bedrooms = $7,
                bathrooms = $8, location = $9, address = $10, city = $11, state = $12,
                description = $13, amenities = $14, status = $15, updated_at = $16
            WHERE id = $1
            "#,
        )
        .bind(p.id)
        .bind(&p.title)
        .bind(p.property_type.as_str())
        .bind(p.listing_type.as_str())
        .bind(p.price)
        .bind(p.area)
        .bind(p.bedrooms)
        .bind(p.bathrooms)
        .bind(&p.location)
        .bind(&p.address)
        .bind(&p.city)
        .bind(&p.state)
        .bind(&p.description)
        .bind(&p.amenities)
        .bind(p.status.as_str())
        .bind(p.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to update property"))?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE appointments SET property_address = $2 WHERE property_id = $1")
            .bind(p.id)
            .bind(&p.address)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to refresh property snapshot"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit property update"))?;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        // The foreign key nulls property_id; the address copy has to go too.
        sqlx::query("UPDATE appointments SET property_address = NULL WHERE property_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to unlink appointments"))?;

        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to delete property"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit property delete"))?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Appointments
// ============================================================================

#[async_trait]
impl OwnedStore<Appointment> for PgStore {
    async fn insert(&self, a: &Appointment) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;
        lock_appointment_references(&mut tx, a).await?;

        let sql = format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        );
        sqlx::query(&sql)
            .bind(a.id)
            .bind(&a.title)
            .bind(&a.description)
            .bind(a.date)
            .bind(a.time)
            .bind(a.client_id)
            .bind(a.property_id)
            .bind(a.broker_id)
            .bind(a.appointment_type.as_str())
            .bind(a.status.as_str())
            .bind(&a.client_name)
            .bind(&a.client_phone)
            .bind(&a.property_address)
            .bind(&a.broker_name)
            .bind(&a.broker_city)
            .bind(a.created_at)
            .bind(a.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to create appointment"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit appointment"))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        let row: Option<AppointmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to get appointment"))?;
        Ok(row.map(Into::into))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Appointment>> {
        self.list_appointments(owner_id, &AppointmentFilter::default())
            .await
    }

    async fn update(&self, a: &Appointment) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;
        lock_appointment_references(&mut tx, a).await?;

        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                title = $2, description = $3, date = $4, time = $5, client_id = $6,
                property_id = $7, type = $8, status = $9, client_name = $10,
                client_phone = $11, property_address = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(a.id)
        .bind(&a.title)
        .bind(&a.description)
        .bind(a.date)
        .bind(a.time)
        .bind(a.client_id)
        .bind(a.property_id)
        .bind(a.appointment_type.as_str())
        .bind(a.status.as_str())
        .bind(&a.client_name)
        .bind(&a.client_phone)
        .bind(&a.property_address)
        .bind(a.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to update appointment"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit appointment update"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to delete appointment"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn list_appointments(
        &self,
        owner_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE broker_id = "
        ));
        query.push_bind(owner_id);

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(date) = filter.date {
            query.push(" AND date = ").push_bind(date);
        }
        if let Some(kind) = filter.appointment_type {
            query.push(" AND type = ").push_bind(kind.as_str());
        }
        if let Some(client_id) = filter.client_id {
            query.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(start) = filter.start_date {
            query.push(" AND date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query.push(" AND date <= ").push_bind(end);
        }
        query.push(" ORDER BY date ASC, time ASC");

        let rows: Vec<AppointmentRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list appointments"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl Storage for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err("Database ping failed"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::tests::broker;

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| DatabaseConfig::default().connection_url());
        let store = PgStore::connect(&DatabaseConfig {
            url: Some(url),
            ..Default::default()
        })
        .await
        .expect("connect");
        store.migrate().await.expect("migrate");
        store
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_unique_email_enforced_by_index() {
        let store = store().await;
        let email = format!("{}@example.com", Uuid::new_v4());
        store.create_user(&broker(&email)).await.unwrap();

        let mut duplicate = broker(&email);
        duplicate.email = email.to_uppercase();
        assert!(matches!(
            store.create_user(&duplicate).await,
            Err(CoreError::EmailExists)
        ));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_user_update_fans_out_in_transaction() {
        let store = store().await;
        let mut user = broker(&format!("{}@example.com", Uuid::new_v4()));
        store.create_user(&user).await.unwrap();

        let client = Client::new(
            crate::client::tests::create_request(),
            user.id,
            &OwnerSnapshot::from(&user),
        );
        OwnedStore::<Client>::insert(&store, &client).await.unwrap();

        user.last_name = "Smith".to_string();
        store.update_user(&user).await.unwrap();

        let client = OwnedStore::<Client>::get(&store, client.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(client.broker_name.as_deref(), Some("Jane Smith"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_appointment_update_to_deleted_property_rejected() {
        let store = store().await;
        let user = broker(&format!("{}@example.com", Uuid::new_v4()));
        store.create_user(&user).await.unwrap();
        let owner = OwnerSnapshot::from(&user);

        let client = Client::new(crate::client::tests::create_request(), user.id, &owner);
        OwnedStore::<Client>::insert(&store, &client).await.unwrap();
        let property = Property::new(
            crate::property::tests::create_request(crate::PropertyType::House),
            user.id,
            &owner,
        );
        OwnedStore::<Property>::insert(&store, &property).await.unwrap();

        let request = crate::CreateAppointmentRequest {
            title: "Site visit".to_string(),
            description: None,
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            client_id: client.id,
            property_id: None,
            appointment_type: crate::AppointmentType::SiteVisit,
        };
        let mut appointment = Appointment::new(request, user.id, &owner, &client, None);
        OwnedStore::<Appointment>::insert(&store, &appointment)
            .await
            .unwrap();

        OwnedStore::<Property>::delete(&store, property.id)
            .await
            .unwrap();
        appointment.link_property(Some(&property));

        assert!(matches!(
            OwnedStore::<Appointment>::update(&store, &appointment).await,
            Err(CoreError::InvalidReference(_))
        ));
        let stored = OwnedStore::<Appointment>::get(&store, appointment.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.property_id.is_none());
    }
}
