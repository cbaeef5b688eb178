//! Profile photo storage on the local filesystem
//!
//! Files are written under the configured root with a generated name
//! `<uuid>_<unix-seconds>.<ext>` and referenced as `/uploads/<name>`.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use enfor_core::UploadConfig;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;

/// Upload and download failures
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please provide a profile photo")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File size must be at most {max_mb} MB")]
    TooLarge { max_mb: usize },

    #[error("Only JPEG, PNG, GIF, and WebP images are allowed")]
    UnsupportedType,

    #[error("Invalid filename")]
    InvalidFilename,

    #[error("File not found")]
    NotFound,

    #[error("Upload storage failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NotFound => AppError::NotFound("File".to_string()),
            UploadError::Io(e) => AppError::Internal(e.to_string()),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// A file written by [`UploadStore::save`]
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    /// Value recorded on the user, `/uploads/<name>`
    pub reference: String,
    pub size: usize,
}

/// A file read back for serving
#[derive(Debug, Clone)]
pub struct ServedFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    /// Strong validator derived from the content
    pub etag: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: config.path.clone(),
            max_file_size: config.max_file_size,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Lower-cased extension of `filename` if it is on the allow-list.
    pub fn allowed_extension(&self, filename: &str) -> Result<String, UploadError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or(UploadError::UnsupportedType)?;

        if self.allowed_extensions.iter().any(|allowed| *allowed == ext) {
            Ok(ext)
        } else {
            Err(UploadError::UnsupportedType)
        }
    }

    /// Check size and type, then write the bytes under a fresh name.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }
        if bytes.len() > self.max_file_size {
            return Err(UploadError::TooLarge {
                max_mb: self.max_file_size / 1024 / 1024,
            });
        }
        let ext = self.allowed_extension(original_name)?;

        tokio::fs::create_dir_all(&self.root).await?;
        let name = format!("{}_{}.{}", Uuid::new_v4(), Utc::now().timestamp(), ext);
        tokio::fs::write(self.root.join(&name), bytes).await?;
        debug!(file = %name, size = bytes.len(), "Stored upload");

        Ok(StoredFile {
            reference: format!("/uploads/{name}"),
            name,
            size: bytes.len(),
        })
    }

    /// Best-effort removal of a stored file.
    pub async fn remove(&self, name: &str) {
        let Ok(name) = sanitize_filename(name) else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(self.root.join(name)).await {
            warn!(file = %name, error = %e, "Failed to remove upload");
        }
    }

    pub async fn read(&self, name: &str) -> Result<ServedFile, UploadError> {
        let name = sanitize_filename(name)?;
        let bytes = match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(UploadError::NotFound),
            Err(e) => return Err(e.into()),
        };

        Ok(ServedFile {
            etag: etag_for(&bytes),
            content_type: content_type_for(name),
            bytes,
        })
    }
}

/// Accept a bare file name only: no separators, no parent segments.
pub fn sanitize_filename(name: &str) -> Result<&str, UploadError> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(UploadError::InvalidFilename);
    }
    Ok(name)
}

pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn etag_for(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("\"{}\"", URL_SAFE_NO_PAD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store(dir: &Path) -> UploadStore {
        UploadStore::new(&UploadConfig {
            path: dir.to_path_buf(),
            max_file_size: 1024,
            ..Default::default()
        })
    }

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("enfor-uploads-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert!(sanitize_filename("../etc/passwd").is_err());
        assert!(sanitize_filename("a/b.png").is_err());
        assert!(sanitize_filename("a\\b.png").is_err());
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("").is_err());
        assert_eq!(sanitize_filename("photo.png").unwrap(), "photo.png");
    }

    #[test]
    fn test_extension_allow_list() {
        let store = store(&temp_dir());
        assert_eq!(store.allowed_extension("me.JPG").unwrap(), "jpg");
        assert_eq!(store.allowed_extension("me.webp").unwrap(), "webp");
        assert!(store.allowed_extension("me.exe").is_err());
        assert!(store.allowed_extension("noext").is_err());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.PNG"), "image/png");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_save_read_remove() {
        let dir = temp_dir();
        let store = store(&dir);

        let stored = store.save("avatar.png", b"not really a png").await.unwrap();
        assert!(stored.reference.starts_with("/uploads/"));
        assert!(stored.name.ends_with(".png"));
        assert_eq!(stored.name.split('_').count(), 2);

        let served = store.read(&stored.name).await.unwrap();
        assert_eq!(served.bytes, b"not really a png");
        assert_eq!(served.content_type, "image/png");
        assert!(served.etag.starts_with('"'));

        store.remove(&stored.name).await;
        assert!(matches!(
            store.read(&stored.name).await,
            Err(UploadError::NotFound)
        ));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_size_and_type_limits() {
        let store = store(&temp_dir());
        assert!(matches!(
            store.save("big.png", &[0u8; 2048]).await,
            Err(UploadError::TooLarge { .. })
        ));
        assert!(matches!(
            store.save("script.sh", b"echo").await,
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            store.save("empty.png", b"").await,
            Err(UploadError::EmptyFile)
        ));
    }

    proptest! {
        #[test]
        fn prop_names_with_separators_are_rejected(
            prefix in "[a-z]{0,8}",
            suffix in "[a-z]{0,8}",
            sep in prop::sample::select(vec!["/", "\\", ".."]),
        ) {
            let name = format!("{prefix}{sep}{suffix}");
            prop_assert!(sanitize_filename(&name).is_err());
        }

        #[test]
        fn prop_plain_names_are_accepted(name in "[a-zA-Z0-9_-]{1,32}\\.(png|jpg)") {
            prop_assert_eq!(sanitize_filename(&name).unwrap(), name.as_str());
        }
    }
}
