//! Authentication service layer
//!
//! Signup, login, token refresh and profile management. Password hashing runs
//! on the blocking pool; tokens come from [`super::jwt`].

use std::sync::Arc;

use enfor_core::user::normalize_email;
use enfor_core::validation::validate_request;
use enfor_core::{
    LoginRequest, PublicUser, SignupRequest, Storage, UpdateProfileRequest, User, UserRole,
};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::jwt::{issue_token, validate_token, Claims, JwtConfig, JwtError};
use super::password::{hash_password_blocking, verify_password_blocking, PasswordConfig};
use crate::error::AppError;

/// Token plus the public projection of the user it was issued for
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Plaintext behind the hash verified when no account matches a login
const DUMMY_PASSWORD: &str = "enfor-no-such-account";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Storage>,
    jwt: JwtConfig,
    password: PasswordConfig,
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Storage>, jwt: JwtConfig, password: PasswordConfig) -> Self {
        Self {
            store,
            jwt,
            password,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt
    }

    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        validate_token(&self.jwt, token)
    }

    /// Hash with the configured cost that no account owns.
    async fn dummy_hash(&self) -> Result<String, AppError> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| {
                hash_password_blocking(DUMMY_PASSWORD.to_string(), self.password.clone())
            })
            .await?;
        Ok(hash.clone())
    }

    fn respond(&self, user: &User) -> Result<AuthResponse, AppError> {
        let token = issue_token(&self.jwt, user.id, &user.email, user.role)?;
        Ok(AuthResponse {
            token,
            user: user.to_public(),
        })
    }

    /// Register a self-service account and issue its first token.
    ///
    /// The early email check only gives a friendlier error; the store's
    /// unique constraint is what actually prevents duplicates.
    pub async fn signup(&self, mut request: SignupRequest) -> Result<AuthResponse, AppError> {
        request.email = normalize_email(&request.email);
        validate_request(&request)?;
        request.check_rules()?;

        if self.store.email_exists(&request.email).await? {
            return Err(AppError::EmailExists);
        }

        let password_hash =
            hash_password_blocking(request.password.clone(), self.password.clone()).await?;
        let user = User::from_signup(request, password_hash);
        self.store.create_user(&user).await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        self.respond(&user)
    }

    /// Provision an account directly, bypassing the self-service role rule.
    pub async fn create_account(
        &self,
        mut request: SignupRequest,
        role: UserRole,
    ) -> Result<User, AppError> {
        request.email = normalize_email(&request.email);
        validate_request(&request)?;

        if self.store.email_exists(&request.email).await? {
            return Err(AppError::EmailExists);
        }

        let password_hash =
            hash_password_blocking(request.password.clone(), self.password.clone()).await?;
        let mut user = User::from_signup(request, password_hash);
        user.role = role;
        user.is_verified = true;
        self.store.create_user(&user).await?;

        info!(user_id = %user.id, role = %user.role, "Account provisioned");
        Ok(user)
    }

    /// Check credentials against active accounts.
    ///
    /// Unknown email and wrong password fail identically, and both pay for
    /// one password verification.
    pub async fn login(&self, mut request: LoginRequest) -> Result<AuthResponse, AppError> {
        request.email = normalize_email(&request.email);
        validate_request(&request)?;

        let Some(user) = self.store.find_active_user_by_email(&request.email).await? else {
            let hash = self.dummy_hash().await?;
            verify_password_blocking(request.password, hash).await?;
            debug!("Login for unknown or inactive email");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password_blocking(request.password, user.password_hash.clone()).await? {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User logged in");
        self.respond(&user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Partial profile update; owned records pick up a changed name or city
    /// in the same write.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: UpdateProfileRequest,
    ) -> Result<User, AppError> {
        validate_request(&patch)?;

        let mut user = self.get_user(user_id).await?;
        let snapshot_changed = user.apply_profile(patch);
        self.store.update_user(&user).await?;

        info!(%user_id, snapshot_changed, "Profile updated");
        Ok(user)
    }

    pub async fn update_profile_image(
        &self,
        user_id: Uuid,
        reference: &str,
    ) -> Result<(), AppError> {
        if !self.store.set_profile_image(user_id, reference).await? {
            return Err(AppError::NotFound("User".to_string()));
        }
        Ok(())
    }

    /// Issue a fresh token for the identity in a still-valid token.
    ///
    /// The user is re-read so a deleted account cannot keep refreshing, and
    /// the new token carries the stored email and role.
    pub async fn refresh(&self, user_id: Uuid) -> Result<AuthResponse, AppError> {
        let user = self.get_user(user_id).await?;
        self.respond(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use chrono::NaiveDate;
    use enfor_core::{
        Client, ClientService, ClientType, CreateClientRequest, MemoryStore, UserStore,
    };

    fn service() -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service =
            AuthService::new(store.clone(), JwtConfig::default(), PasswordConfig::light());
        (service, store)
    }

    fn signup_request(email: &str) -> SignupRequest {
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

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_then_token_round_trip() {
        let (service, store) = service();
        let response = service.signup(signup_request("jane@example.com")).await.unwrap();

        let claims = service.validate(&response.token).unwrap();
        assert_eq!(claims.user_id, response.user.id);
        assert_eq!(claims.role, UserRole::Broker);

        let stored = store.find_user_by_id(response.user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret123");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_duplicate_email_case_insensitive() {
        let (service, _) = service();
        service.signup(signup_request("jane@example.com")).await.unwrap();
        let result = service.signup(signup_request("JANE@example.com")).await;
        assert!(matches!(result, Err(AppError::EmailExists)));
    }

    #[tokio::test]
    async fn test_signup_as_admin_rejected() {
        let (service, _) = service();
        let mut request = signup_request("root@example.com");
        request.role = UserRole::Admin;
        assert!(matches!(
            service.signup(request).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _) = service();
        service.signup(signup_request("jane@example.com")).await.unwrap();

        let wrong_password = service
            .login(login("jane@example.com", "wrong-password"))
            .await
            .unwrap_err();
        let unknown_email = service
            .login(login("nobody@example.com", "secret123"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_unknown_email_still_verifies_a_hash() {
        let (service, _) = service();
        assert!(service.dummy_hash.get().is_none());

        let result = service.login(login("nobody@example.com", "secret123")).await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));

        let hash = service.dummy_hash.get().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(DUMMY_PASSWORD, hash).unwrap());
    }

    #[tokio::test]
    async fn test_dummy_hash_uses_configured_cost() {
        let (service, _) = service();
        let dummy = service.dummy_hash().await.unwrap();
        let real = hash_password_blocking("secret123".to_string(), PasswordConfig::light())
            .await
            .unwrap();

        let params = |hash: &str| hash.split('$').nth(3).unwrap().to_string();
        assert_eq!(params(&dummy), params(&real));
    }

    #[tokio::test]
    async fn test_signup_normalizes_padded_email() {
        let (service, _) = service();
        let response = service
            .signup(signup_request("  Jane@Example.com "))
            .await
            .unwrap();
        assert_eq!(response.user.email, "jane@example.com");
    }

    #[tokio::test]
    async fn test_login_normalizes_email() {
        let (service, _) = service();
        service.signup(signup_request("jane@example.com")).await.unwrap();
        let response = service
            .login(login("  Jane@Example.com ", "secret123"))
            .await
            .unwrap();
        assert_eq!(response.user.email, "jane@example.com");
    }

    #[tokio::test]
    async fn test_refresh_issues_new_token() {
        let (service, _) = service();
        let signup = service.signup(signup_request("jane@example.com")).await.unwrap();
        let refreshed = service.refresh(signup.user.id).await.unwrap();
        let claims = service.validate(&refreshed.token).unwrap();
        assert_eq!(claims.user_id, signup.user.id);

        assert!(matches!(
            service.refresh(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_update_fans_out() {
        let (service, store) = service();
        let signup = service.signup(signup_request("jane@example.com")).await.unwrap();
        let owner = signup.user.id;

        let clients = ClientService::new(store.clone());
        let client: Client = clients
            .create(
                owner,
                CreateClientRequest {
                    first_name: "Ravi".to_string(),
                    last_name: "Kumar".to_string(),
                    email: "ravi@example.com".to_string(),
                    phone: "9123456780".to_string(),
                    client_type: ClientType::Buyer,
                    preferred_location: "Andheri".to_string(),
                    budget_min: None,
                    budget_max: None,
                    requirements: "Two bedroom flat".to_string(),
                    address: "4 Lokhandwala Complex".to_string(),
                    city: "Mumbai".to_string(),
                    state: "Maharashtra".to_string(),
                    postal_code: "400053".to_string(),
                    notes: None,
                    status: None,
                },
            )
            .await
            .unwrap();

        service
            .update_profile(
                owner,
                UpdateProfileRequest {
                    first_name: Some("Janet".to_string()),
                    city: Some("Pune".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let client = clients.get(client.id, owner).await.unwrap();
        assert_eq!(client.broker_name.as_deref(), Some("Janet Doe"));
        assert_eq!(client.broker_city.as_deref(), Some("Pune"));
    }

    #[tokio::test]
    async fn test_create_account_with_admin_role() {
        let (service, _) = service();
        let user = service
            .create_account(signup_request("admin@example.com"), UserRole::Admin)
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::Admin);

        let response = service
            .login(login("admin@example.com", "secret123"))
            .await
            .unwrap();
        assert_eq!(response.user.role, UserRole::Admin);
    }
}
