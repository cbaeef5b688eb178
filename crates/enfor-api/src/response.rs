//! Success envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{ "message": ..., "data": ... }`; `data` is omitted when there is none.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of<T: Serialize>(response: ApiResponse<T>) -> (StatusCode, serde_json::Value) {
        let response = response.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_created_envelope() {
        let (status, json) = body_of(ApiResponse::created("Client created successfully", 7)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["message"], "Client created successfully");
        assert_eq!(json["data"], 7);
    }

    #[tokio::test]
    async fn test_message_only_envelope() {
        let (status, json) = body_of(ApiResponse::message("Logout successful")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("data").is_none());
        assert!(json.get("status").is_none());
    }
}
