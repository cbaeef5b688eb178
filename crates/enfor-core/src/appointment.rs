//! Appointments linking a broker, a client and optionally a property

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::validation::hhmm;
use crate::{Client, CoreError, OwnedEntity, OwnerSnapshot, Property, Result};

wire_enum! {
    pub enum AppointmentType {
        #[default]
        SiteVisit => "site_visit",
        Meeting => "meeting",
        Call => "call",
    }
}

wire_enum! {
    pub enum AppointmentStatus {
        #[default]
        Scheduled => "scheduled",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

/// A scheduled event owned by one broker
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Appointment {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "14:30")]
    pub time: NaiveTime,

    pub client_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<Uuid>,
    pub broker_id: Uuid,

    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,

    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub property_address: Option<String>,
    pub broker_name: Option<String>,
    pub broker_city: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Build a scheduled appointment. `client` and `property` must already be
    /// verified as belonging to `broker_id`.
    pub fn new(
        request: CreateAppointmentRequest,
        broker_id: Uuid,
        owner: &OwnerSnapshot,
        client: &Client,
        property: Option<&Property>,
    ) -> Self {
        let now = Utc::now();
        let mut appointment = Self {
            id: Uuid::new_v4(),
            title: request.title,
            description: request.description,
            date: request.date,
            time: request.time,
            client_id: client.id,
            property_id: None,
            broker_id,
            appointment_type: request.appointment_type,
            status: AppointmentStatus::Scheduled,
            client_name: None,
            client_phone: None,
            property_address: None,
            broker_name: Some(owner.name.clone()),
            broker_city: Some(owner.city.clone()),
            created_at: now,
            updated_at: now,
        };
        appointment.link_client(client);
        appointment.link_property(property);
        appointment
    }

    /// Point at `client` and copy its name and phone.
    pub fn link_client(&mut self, client: &Client) {
        self.client_id = client.id;
        self.client_name = Some(client.display_name());
        self.client_phone = Some(client.phone.clone());
    }

    /// Point at `property` (or nothing) and copy its address.
    pub fn link_property(&mut self, property: Option<&Property>) {
        self.property_id = property.map(|p| p.id);
        self.property_address = property.map(|p| p.address.clone());
    }

    /// Apply the scalar fields of an update. Client and property links are
    /// resolved and applied separately.
    pub fn apply(&mut self, patch: &UpdateAppointmentRequest) {
        if let Some(v) = &patch.title {
            self.title = v.clone();
        }
        if let Some(v) = &patch.description {
            self.description = Some(v.clone());
        }
        if let Some(v) = patch.date {
            self.date = v;
        }
        if let Some(v) = patch.time {
            self.time = v;
        }
        if let Some(v) = patch.appointment_type {
            self.appointment_type = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
    }
}

impl OwnedEntity for Appointment {
    const KIND: &'static str = "Appointment";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.broker_id
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Appointment creation request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAppointmentRequest {
    #[validate(length(min = 5, max = 255))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// `YYYY-MM-DD`
    pub date: NaiveDate,

    /// `HH:MM`
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "14:30")]
    pub time: NaiveTime,

    pub client_id: Uuid,

    /// An empty string is treated as absent
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>)]
    pub property_id: Option<Uuid>,

    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
}

/// Change to an appointment's property link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyLink {
    /// Remove the property from the appointment
    Clear,
    Set(Uuid),
}

impl<'de> Deserialize<'de> for PropertyLink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        if value.trim().is_empty() {
            return Ok(PropertyLink::Clear);
        }
        Uuid::parse_str(value.trim())
            .map(PropertyLink::Set)
            .map_err(|_| serde::de::Error::custom("property_id must be a valid UUID"))
    }
}

/// Partial appointment update
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAppointmentRequest {
    #[validate(length(min = 5, max = 255))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub date: Option<NaiveDate>,

    #[serde(default, with = "hhmm::option")]
    #[schema(value_type = Option<String>, example = "14:30")]
    pub time: Option<NaiveTime>,

    pub client_id: Option<Uuid>,

    /// A UUID relinks the property, an empty string removes it
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub property_id: Option<PropertyLink>,

    #[serde(rename = "type")]
    pub appointment_type: Option<AppointmentType>,

    pub status: Option<AppointmentStatus>,
}

fn empty_as_none<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Uuid>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.trim().is_empty() => Uuid::parse_str(value.trim())
            .map(Some)
            .map_err(|_| serde::de::Error::custom("property_id must be a valid UUID")),
        _ => Ok(None),
    }
}

/// Listing filters, combined with AND
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,

    /// Exact date
    #[param(value_type = Option<String>, example = "2026-03-14")]
    pub date: Option<NaiveDate>,

    #[serde(rename = "type")]
    pub appointment_type: Option<AppointmentType>,

    pub client_id: Option<Uuid>,

    /// Inclusive lower bound
    #[param(value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,

    /// Inclusive upper bound
    #[param(value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.status.map_or(true, |s| appointment.status == s)
            && self.date.map_or(true, |d| appointment.date == d)
            && self
                .appointment_type
                .map_or(true, |t| appointment.appointment_type == t)
            && self.client_id.map_or(true, |c| appointment.client_id == c)
            && self.start_date.map_or(true, |d| appointment.date >= d)
            && self.end_date.map_or(true, |d| appointment.date <= d)
    }

    pub fn check_rules(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(CoreError::validation(
                    "start_date must not be after end_date",
                ));
            }
        }
        Ok(())
    }
}

/// Ascending by date, then time.
pub fn sort_chronologically(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
}

/// Per-broker appointment counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentStats {
    /// Appointments dated within the current calendar month
    pub total_this_month: usize,
    pub today_appointments: usize,
    pub scheduled_appointments: usize,
    pub completed_appointments: usize,
    pub cancelled_appointments: usize,
    pub appointments_by_type: BTreeMap<String, usize>,
}

impl AppointmentStats {
    pub fn compute(appointments: &[Appointment], today: NaiveDate) -> Self {
        let mut stats = Self::default();

        for appointment in appointments {
            if appointment.date.year() == today.year() && appointment.date.month() == today.month()
            {
                stats.total_this_month += 1;
            }
            if appointment.date == today {
                stats.today_appointments += 1;
            }
            match appointment.status {
                AppointmentStatus::Scheduled => stats.scheduled_appointments += 1,
                AppointmentStatus::Completed => stats.completed_appointments += 1,
                AppointmentStatus::Cancelled => stats.cancelled_appointments += 1,
            }
            *stats
                .appointments_by_type
                .entry(appointment.appointment_type.to_string())
                .or_default() += 1;
        }

        stats
    }
}
