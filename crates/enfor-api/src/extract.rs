//! Request extractors

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    Json,
};
use enfor_core::validation::validate_request;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// JSON body that has passed its derived field validation.
///
/// Malformed JSON, wrong types and rule violations all reject with a
/// `VALIDATION_ERROR` body.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        validate_request(&value)?;
        Ok(ValidatedJson(value))
    }
}

/// Path parameters whose parse failure renders as `VALIDATION_ERROR`.
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string whose parse failure renders as `VALIDATION_ERROR`.
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use enfor_core::LoginRequest;

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let ValidatedJson(login) = ValidatedJson::<LoginRequest>::from_request(
            json_request(r#"{"email":"jane@example.com","password":"secret123"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(login.email, "jane@example.com");
    }

    #[tokio::test]
    async fn test_rule_violation_is_validation_error() {
        let err = ValidatedJson::<LoginRequest>::from_request(
            json_request(r#"{"email":"not-an-email","password":"secret123"}"#),
            &(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("email"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let err = ValidatedJson::<LoginRequest>::from_request(json_request("{"), &())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
