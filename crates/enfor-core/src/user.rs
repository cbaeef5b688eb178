//! User accounts
//!
//! A user is a broker, a channel partner or an administrator. Brokers own the
//! clients, properties and appointments they create; their display name and
//! city are copied onto those records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{CoreError, Result};

wire_enum! {
    /// Access level carried in tokens and checked by role-gated routes
    pub enum UserRole {
        #[default]
        Broker => "broker",
        ChannelPartner => "channel_partner",
        Admin => "admin",
    }
}

impl UserRole {
    /// Roles a visitor may pick at signup. Administrators are provisioned out of band.
    pub fn is_self_service(&self) -> bool {
        !matches!(self, UserRole::Admin)
    }
}

/// Normalise an email address for lookup and uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,

    /// Unique, stored lower-cased
    pub email: String,

    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub date_of_birth: Option<NaiveDate>,
    pub firm_name: String,
    pub role: UserRole,

    pub whatsapp_number: String,
    pub alternative_number: Option<String>,
    pub foreign_number: Option<String>,

    pub address: String,
    pub location: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,

    /// Relative reference to the uploaded photo (`/uploads/<name>`)
    pub profile_image: Option<String>,

    pub is_verified: bool,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new, active, unverified account from a signup request.
    pub fn from_signup(request: SignupRequest, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: normalize_email(&request.email),
            password_hash,
            date_of_birth: Some(request.date_of_birth),
            firm_name: request.firm_name,
            role: request.role,
            whatsapp_number: request.whatsapp_number,
            alternative_number: request.alternative_number.filter(|s| !s.trim().is_empty()),
            foreign_number: request.foreign_number.filter(|s| !s.trim().is_empty()),
            address: request.address,
            location: request.location,
            city: request.city,
            state: request.state,
            postal_code: request.postal_code,
            profile_image: None,
            is_verified: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// "First Last", the form copied onto owned records as `broker_name`.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Projection safe to return to API callers
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            firm_name: self.firm_name.clone(),
            role: self.role,
            city: self.city.clone(),
            state: self.state.clone(),
            is_verified: self.is_verified,
            profile_image: self.profile_image.clone(),
            created_at: self.created_at,
        }
    }

    /// Apply a profile patch. Returns true when the name or city changed,
    /// which means owned records need their broker snapshot refreshed.
    pub fn apply_profile(&mut self, patch: UpdateProfileRequest) -> bool {
        let before = (self.display_name(), self.city.clone());

        if let Some(v) = patch.first_name {
            self.first_name = v.trim().to_string();
        }
        if let Some(v) = patch.last_name {
            self.last_name = v.trim().to_string();
        }
        if let Some(v) = patch.firm_name {
            self.firm_name = v;
        }
        if let Some(v) = patch.whatsapp_number {
            self.whatsapp_number = v;
        }
        if let Some(v) = patch.alternative_number {
            self.alternative_number = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = patch.foreign_number {
            self.foreign_number = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = patch.address {
            self.address = v;
        }
        if let Some(v) = patch.location {
            self.location = v;
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
        self.updated_at = Utc::now();

        before != (self.display_name(), self.city.clone())
    }
}

/// User data that can be returned to any authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub firm_name: String,
    pub role: UserRole,
    pub city: String,
    pub state: String,
    pub is_verified: bool,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 2, max = 100))]
    pub first_name: String,

    #[validate(length(min = 2, max = 100))]
    pub last_name: String,

    #[validate(email)]
    #[schema(example = "jane.doe@example.com")]
    pub email: String,

    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,

    /// `YYYY-MM-DD`
    #[schema(example = "1988-04-12")]
    pub date_of_birth: NaiveDate,

    #[validate(length(min = 2, max = 255))]
    pub firm_name: String,

    /// `broker` or `channel_partner`
    pub role: UserRole,

    #[validate(length(min = 10, max = 20))]
    pub whatsapp_number: String,

    #[serde(default)]
    pub alternative_number: Option<String>,

    #[serde(default)]
    pub foreign_number: Option<String>,

    #[validate(length(min = 10))]
    pub address: String,

    #[validate(length(min = 2, max = 255))]
    pub location: String,

    #[validate(length(min = 2, max = 100))]
    pub city: String,

    #[validate(length(min = 2, max = 100))]
    pub state: String,

    #[validate(length(min = 4, max = 20))]
    pub postal_code: String,
}

impl SignupRequest {
    /// Rules the derive cannot express.
    pub fn check_rules(&self) -> Result<()> {
        if !self.role.is_self_service() {
            return Err(CoreError::validation(
                "role must be one of: broker, channel_partner",
            ));
        }
        Ok(())
    }
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100))]
    pub first_name: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub last_name: Option<String>,

    #[validate(length(min = 2, max = 255))]
    pub firm_name: Option<String>,

    #[validate(length(min = 10, max = 20))]
    pub whatsapp_number: Option<String>,

    pub alternative_number: Option<String>,
    pub foreign_number: Option<String>,

    #[validate(length(min = 10))]
    pub address: Option<String>,

    #[validate(length(min = 2, max = 255))]
    pub location: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub city: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub state: Option<String>,

    #[validate(length(min = 4, max = 20))]
    pub postal_code: Option<String>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::validation::validate_request;

    pub(crate) fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1988, 4, 12).unwrap(),
            firm_name: "Doe Realty".to_string(),
            role: UserRole::Broker,
            whatsapp_number: "9876543210".to_string(),
            alternative_number: None,
            foreign_number: None,
            address: "12 Harbour View Road".to_string(),
            location: "Bandra West".to_string(),
            city: "Mumbai".to_string(),
            state: "Maharashtra".to_string(),
            postal_code: "400050".to_string(),
        }
    }

    pub(crate) fn broker(email: &str) -> User {
        User::from_signup(signup_request(email), "hash".to_string())
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(UserRole::ChannelPartner.as_str(), "channel_partner");
        assert_eq!(
            "channel_partner".parse::<UserRole>().unwrap(),
            UserRole::ChannelPartner
        );
        assert!("superuser".parse::<UserRole>().is_err());
        assert_eq!(
            serde_json::to_string(&UserRole::Admin).unwrap(),
            "\"admin\""
        );
    }

    #[test]
    fn test_signup_rejects_admin_role() {
        let mut request = signup_request("a@example.com");
        request.role = UserRole::Admin;
        assert!(request.check_rules().is_err());
    }

    #[test]
    fn test_signup_field_rules() {
        let mut request = signup_request("not-an-email");
        assert!(validate_request(&request).is_err());

        request.email = "ok@example.com".to_string();
        request.password = "12345".to_string();
        let err = validate_request(&request).unwrap_err();
        assert!(err.to_string().contains("password must be at least 6"));

        request.password = "123456".to_string();
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_email_is_normalized() {
        let user = broker("  Jane.Doe@Example.COM ");
        assert_eq!(user.email, "jane.doe@example.com");
    }

    #[test]
    fn test_public_projection_has_no_hash() {
        let user = broker("jane@example.com");
        let json = serde_json::to_value(user.to_public()).unwrap();
        assert!(json.get("password_hash").is_none());

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_apply_profile_reports_snapshot_change() {
        let mut user = broker("jane@example.com");
        let changed = user.apply_profile(UpdateProfileRequest {
            firm_name: Some("New Firm".to_string()),
            ..Default::default()
        });
        assert!(!changed);

        let changed = user.apply_profile(UpdateProfileRequest {
            last_name: Some("Smith".to_string()),
            ..Default::default()
        });
        assert!(changed);
        assert_eq!(user.display_name(), "Jane Smith");
    }
}
