//! Property listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{check_rooms, rule_to_core};
use crate::{CoreError, OwnedEntity, OwnerSnapshot, Result};

wire_enum! {
    pub enum PropertyType {
        #[default]
        Apartment => "apartment",
        House => "house",
        Commercial => "commercial",
        Plot => "plot",
    }
}

impl PropertyType {
    /// Residential types must state bedroom and bathroom counts.
    pub fn requires_rooms(&self) -> bool {
        matches!(self, PropertyType::Apartment | PropertyType::House)
    }
}

wire_enum! {
    pub enum ListingType {
        #[default]
        Sale => "sale",
        Rent => "rent",
    }
}

wire_enum! {
    pub enum PropertyStatus {
        #[default]
        Available => "available",
        Sold => "sold",
        Rented => "rented",
        UnderNegotiation => "under_negotiation",
    }
}

/// A listing owned by one broker
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Property {
    pub id: Uuid,
    pub title: String,

    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub listing_type: ListingType,

    pub price: f64,
    /// Square feet
    pub area: f64,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,

    pub location: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub description: String,
    pub amenities: Vec<String>,
    pub status: PropertyStatus,

    pub broker_id: Uuid,
    pub broker_name: Option<String>,
    pub broker_city: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn new(request: CreatePropertyRequest, broker_id: Uuid, owner: &OwnerSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: request.title,
            property_type: request.property_type,
            listing_type: request.listing_type,
            price: request.price,
            area: request.area,
            bedrooms: request.bedrooms,
            bathrooms: request.bathrooms,
            location: request.location,
            address: request.address,
            city: request.city,
            state: request.state,
            description: request.description,
            amenities: normalize_amenities(request.amenities),
            status: request.status.unwrap_or_default(),
            broker_id,
            broker_name: Some(owner.name.clone()),
            broker_city: Some(owner.city.clone()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Absent fields are left untouched.
    pub fn apply(&mut self, patch: UpdatePropertyRequest) {
        if let Some(v) = patch.title {
            self.title = v;
        }
        if let Some(v) = patch.property_type {
            self.property_type = v;
        }
        if let Some(v) = patch.listing_type {
            self.listing_type = v;
        }
        if let Some(v) = patch.price {
            self.price = v;
        }
        if let Some(v) = patch.area {
            self.area = v;
        }
        if let Some(v) = patch.bedrooms {
            self.bedrooms = Some(v);
        }
        if let Some(v) = patch.bathrooms {
            self.bathrooms = Some(v);
        }
        if let Some(v) = patch.location {
            self.location = v;
        }
        if let Some(v) = patch.address {
            self.address = v;
        }
        if let Some(v) = patch.city {
            self.city = v;
        }
        if let Some(v) = patch.state {
            self.state = v;
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.amenities {
            self.amenities = normalize_amenities(v);
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
    }

    pub fn check_rules(&self) -> Result<()> {
        check_amounts(Some(self.price), Some(self.area))?;
        check_rooms(
            self.property_type.requires_rooms(),
            self.bedrooms,
            self.bathrooms,
        )
        .map_err(rule_to_core)
    }
}

impl OwnedEntity for Property {
    const KIND: &'static str = "Property";

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

/// Amenities form a set: trimmed, de-duplicated, empty tags dropped.
fn normalize_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(amenities.len());
    for tag in amenities {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

fn check_amounts(price: Option<f64>, area: Option<f64>) -> Result<()> {
    if price.is_some_and(|p| !(p > 0.0)) {
        return Err(CoreError::validation("price must be greater than 0"));
    }
    if area.is_some_and(|a| !(a > 0.0)) {
        return Err(CoreError::validation("area must be greater than 0"));
    }
    Ok(())
}

/// Property creation request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePropertyRequest {
    #[validate(length(min = 5, max = 255))]
    pub title: String,

    #[serde(rename = "type")]
    pub property_type: PropertyType,

    pub listing_type: ListingType,
    pub price: f64,
    pub area: f64,

    /// Required for apartments and houses
    #[serde(default)]
    pub bedrooms: Option<i32>,

    /// Required for apartments and houses
    #[serde(default)]
    pub bathrooms: Option<i32>,

    #[validate(length(min = 2, max = 255))]
    pub location: String,

    #[validate(length(min = 10))]
    pub address: String,

    #[validate(length(min = 2, max = 100))]
    pub city: String,

    #[validate(length(min = 2, max = 100))]
    pub state: String,

    #[validate(length(min = 20))]
    pub description: String,

    #[serde(default)]
    pub amenities: Vec<String>,

    /// Defaults to `available`
    #[serde(default)]
    pub status: Option<PropertyStatus>,
}

impl CreatePropertyRequest {
    pub fn check_rules(&self) -> Result<()> {
        check_amounts(Some(self.price), Some(self.area))?;
        check_rooms(
            self.property_type.requires_rooms(),
            self.bedrooms,
            self.bathrooms,
        )
        .map_err(rule_to_core)
    }
}

/// Partial property update
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePropertyRequest {
    #[validate(length(min = 5, max = 255))]
    pub title: Option<String>,

    #[serde(rename = "type")]
    pub property_type: Option<PropertyType>,

    pub listing_type: Option<ListingType>,
    pub price: Option<f64>,
    pub area: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,

    #[validate(length(min = 2, max = 255))]
    pub location: Option<String>,

    #[validate(length(min = 10))]
    pub address: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub city: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub state: Option<String>,

    #[validate(length(min = 20))]
    pub description: Option<String>,

    pub amenities: Option<Vec<String>>,
    pub status: Option<PropertyStatus>,
}

impl UpdatePropertyRequest {
    /// Field-local checks; the room rule is enforced on the merged record.
    pub fn check_rules(&self) -> Result<()> {
        check_amounts(self.price, self.area)?;
        check_rooms(false, self.bedrooms, self.bathrooms).map_err(rule_to_core)
    }
}
