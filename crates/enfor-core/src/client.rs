//! Clients: buyers, sellers, tenants and owners tracked by a broker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::{check_budget, rule_to_core};
use crate::{OwnedEntity, OwnerSnapshot, Result};

wire_enum! {
    /// Client classification
    pub enum ClientType {
        #[default]
        Buyer => "buyer",
        Seller => "seller",
        Tenant => "tenant",
        Owner => "owner",
    }
}

wire_enum! {
    /// Client pipeline status
    pub enum ClientStatus {
        #[default]
        Active => "active",
        Converted => "converted",
        Inactive => "inactive",
    }
}

/// A prospective counterparty owned by one broker
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Client {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,

    #[serde(rename = "type")]
    pub client_type: ClientType,
    pub status: ClientStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_max: Option<f64>,

    pub preferred_location: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub requirements: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub broker_id: Uuid,
    pub broker_name: Option<String>,
    pub broker_city: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(request: CreateClientRequest, broker_id: Uuid, owner: &OwnerSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email.trim().to_string(),
            phone: request.phone,
            client_type: request.client_type,
            status: request.status.unwrap_or_default(),
            budget_min: request.budget_min,
            budget_max: request.budget_max,
            preferred_location: request.preferred_location,
            address: request.address,
            city: request.city,
            state: request.state,
            postal_code: request.postal_code,
            requirements: request.requirements,
            notes: request.notes,
            broker_id,
            broker_name: Some(owner.name.clone()),
            broker_city: Some(owner.city.clone()),
            created_at: now,
            updated_at: now,
        }
    }

    /// "First Last", the form copied onto appointments as `client_name`.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Apply a partial update. Absent fields are left untouched.
    pub fn apply(&mut self, patch: UpdateClientRequest) {
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.email {
            self.email = v.trim().to_string();
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
        if let Some(v) = patch.client_type {
            self.client_type = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.budget_min {
            self.budget_min = Some(v);
        }
        if let Some(v) = patch.budget_max {
            self.budget_max = Some(v);
        }
        if let Some(v) = patch.preferred_location {
            self.preferred_location = v;
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
        if let Some(v) = patch.postal_code {
            self.postal_code = v;
        }
        if let Some(v) = patch.requirements {
            self.requirements = v;
        }
        if let Some(v) = patch.notes {
            self.notes = Some(v);
        }
    }

    /// Invariants that must hold on the stored record.
    pub fn check_rules(&self) -> Result<()> {
        check_budget(self.budget_min, self.budget_max).map_err(rule_to_core)
    }
}

impl OwnedEntity for Client {
    const KIND: &'static str = "Client";

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

/// Client creation request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 2, max = 100))]
    pub first_name: String,

    #[validate(length(min = 2, max = 100))]
    pub last_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 10, max = 20))]
    pub phone: String,

    #[serde(rename = "type")]
    pub client_type: ClientType,

    /// Defaults to `active`
    #[serde(default)]
    pub status: Option<ClientStatus>,

    #[serde(default)]
    pub budget_min: Option<f64>,

    #[serde(default)]
    pub budget_max: Option<f64>,

    #[validate(length(min = 2, max = 255))]
    pub preferred_location: String,

    #[validate(length(min = 10))]
    pub address: String,

    #[validate(length(min = 2, max = 100))]
    pub city: String,

    #[validate(length(min = 2, max = 100))]
    pub state: String,

    #[validate(length(min = 4, max = 20))]
    pub postal_code: String,

    #[validate(length(min = 5))]
    pub requirements: String,

    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateClientRequest {
    pub fn check_rules(&self) -> Result<()> {
        check_budget(self.budget_min, self.budget_max).map_err(rule_to_core)
    }
}

/// Partial client update
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateClientRequest {
    #[validate(length(min = 2, max = 100))]
    pub first_name: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub last_name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(min = 10, max = 20))]
    pub phone: Option<String>,

    #[serde(rename = "type")]
    pub client_type: Option<ClientType>,

    pub status: Option<ClientStatus>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,

    #[validate(length(min = 2, max = 255))]
    pub preferred_location: Option<String>,

    #[validate(length(min = 10))]
    pub address: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub city: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub state: Option<String>,

    #[validate(length(min = 4, max = 20))]
    pub postal_code: Option<String>,

    #[validate(length(min = 5))]
    pub requirements: Option<String>,

    pub notes: Option<String>,
}

impl UpdateClientRequest {
    pub fn check_rules(&self) -> Result<()> {
        check_budget(self.budget_min, self.budget_max).map_err(rule_to_core)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::validation::validate_request;

    pub(crate) fn create_request() -> CreateClientRequest {
        CreateClientRequest {
            first_name: "Ravi".to_string(),
            last_name: "Kumar".to_string(),
            email: "ravi@example.com".to_string(),
            phone: "9123456780".to_string(),
            client_type: ClientType::Buyer,
            status: None,
            budget_min: Some(2000.0),
            budget_max: Some(5000.0),
            preferred_location: "Andheri".to_string(),
            address: "45 Linking Road, Khar".to_string(),
            city: "Mumbai".to_string(),
            state: "Maharashtra".to_string(),
            postal_code: "400052".to_string(),
            requirements: "2BHK near the station".to_string(),
            notes: None,
        }
    }

    fn owner() -> OwnerSnapshot {
        OwnerSnapshot {
            name: "Jane Doe".to_string(),
            city: "Mumbai".to_string(),
        }
    }

    #[test]
    fn test_new_client_defaults() {
        let client = Client::new(create_request(), Uuid::new_v4(), &owner());
        assert_eq!(client.status, ClientStatus::Active);
        assert_eq!(client.broker_name.as_deref(), Some("Jane Doe"));
        assert_eq!(client.display_name(), "Ravi Kumar");
    }

    #[test]
    fn test_request_budget_rule() {
        let mut request = create_request();
        assert!(request.check_rules().is_ok());

        request.budget_min = Some(100.0);
        request.budget_max = Some(50.0);
        assert!(request.check_rules().is_err());

        request.budget_min = Some(-5.0);
        request.budget_max = None;
        assert!(request.check_rules().is_err());
    }

    #[test]
    fn test_patch_leaves_absent_fields() {
        let mut client = Client::new(create_request(), Uuid::new_v4(), &owner());
        client.apply(UpdateClientRequest {
            status: Some(ClientStatus::Converted),
            ..Default::default()
        });
        assert_eq!(client.status, ClientStatus::Converted);
        assert_eq!(client.first_name, "Ravi");
        assert_eq!(client.budget_max, Some(5000.0));
    }

    #[test]
    fn test_patch_can_break_budget_order() {
        let mut client = Client::new(create_request(), Uuid::new_v4(), &owner());
        client.apply(UpdateClientRequest {
            budget_min: Some(9000.0),
            ..Default::default()
        });
        assert!(client.check_rules().is_err());
    }

    #[test]
    fn test_field_validation() {
        let mut request = create_request();
        request.requirements = "2BHK".to_string();
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_type_serialized_as_type() {
        let client = Client::new(create_request(), Uuid::new_v4(), &owner());
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["type"], "buyer");
        assert_eq!(json["status"], "active");
    }
}
