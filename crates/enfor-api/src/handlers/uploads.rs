//! Profile photo upload and serving

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::audit::{audit_log, AuditEvent};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::ApiPath;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::uploads::UploadError;

/// Multipart field carrying the image
pub const PROFILE_PHOTO_FIELD: &str = "profile_photo";

/// Multipart form accepted by the upload endpoint
#[derive(ToSchema)]
pub struct ProfilePhotoForm {
    #[schema(value_type = String, format = Binary)]
    pub profile_photo: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfilePhotoResponse {
    /// `/uploads/<name>`
    pub profile_image: String,
}

fn multipart_error(err: MultipartError, max_file_size: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge {
            max_mb: max_file_size / 1024 / 1024,
        }
        .into()
    } else {
        AppError::Validation(err.body_text())
    }
}

/// Upload a profile photo for the caller
///
/// Expects `multipart/form-data` with the image in the `profile_photo` field.
#[utoipa::path(
    post,
    path = "/api/upload/profile-photo",
    tag = "uploads",
    request_body(content = ProfilePhotoForm, content_type = "multipart/form-data"),
    responses(
        (
            status = 200,
            description = "Profile photo uploaded successfully",
            body = ProfilePhotoResponse
        ),
        (
            status = 400,
            description = "Missing, empty, oversized or unsupported file",
            body = crate::error::ApiError
        ),
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_profile_photo(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<ProfilePhotoResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;
    let max = state.uploads.max_file_size();

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        if field.name() != Some(PROFILE_PHOTO_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, max))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload.ok_or(UploadError::MissingFile)?;
    let stored = state.uploads.save(&file_name, &bytes).await?;

    if let Err(e) = state
        .auth
        .update_profile_image(user.user_id, &stored.reference)
        .await
    {
        warn!(
            user_id = %user.user_id,
            file = %stored.name,
            "Discarding upload after failed profile update"
        );
        state.uploads.remove(&stored.name).await;
        return Err(e);
    }

    audit_log(&AuditEvent::ProfilePhotoUploaded {
        user_id: user.user_id,
        reference: stored.reference.clone(),
        size_bytes: stored.size,
    });

    Ok(ApiResponse::ok(
        "Profile photo uploaded successfully",
        ProfilePhotoResponse {
            profile_image: stored.reference,
        },
    ))
}

/// Serve an uploaded file
///
/// Names with path separators or `..` are rejected. Supports conditional
/// requests through `If-None-Match`.
#[utoipa::path(
    get,
    path = "/api/uploads/{filename}",
    tag = "uploads",
    params(("filename" = String, Path, description = "Stored file name")),
    responses(
        (status = 200, description = "File contents"),
        (status = 304, description = "Not modified"),
        (status = 400, description = "Invalid filename", body = crate::error::ApiError),
        (status = 404, description = "File not found", body = crate::error::ApiError),
    )
)]
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    ApiPath(filename): ApiPath<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let file = state.uploads.read(&filename).await?;

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == file.etag));

    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, file.etag)]).into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::ETAG, file.etag),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        file.bytes,
    )
        .into_response())
}
