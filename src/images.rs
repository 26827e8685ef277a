//! Venue image storage.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::utils::error::AppError;

/// Route under which stored images are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the image and returns the URL clients should use to fetch it.
    async fn save(&self, content_type: &str, bytes: Bytes) -> Result<String, AppError>;

    /// Removes an image previously returned by [`ImageStore::save`]. Unknown URLs
    /// are ignored.
    async fn discard(&self, url: &str) -> Result<(), AppError>;
}

/// File name behind an `/uploads/<name>` URL, if it is one this module issued.
fn stored_name(url: &str) -> Option<&str> {
    url.strip_prefix(UPLOADS_ROUTE)?
        .strip_prefix('/')
        .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
}

fn extension_for(content_type: &str) -> Result<&'static str, AppError> {
    match content_type {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/gif" => Ok("gif"),
        "image/webp" => Ok("webp"),
        other => Err(AppError::ValidationError(format!(
            "Unsupported image type '{other}'"
        ))),
    }
}

pub struct DiskImageStore {
    root: PathBuf,
}

impl DiskImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn save(&self, content_type: &str, bytes: Bytes) -> Result<String, AppError> {
        let file_name = format!("{}.{}", Uuid::new_v4(), extension_for(content_type)?);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::InternalFailure(format!("cannot create upload dir: {e}")))?;
        tokio::fs::write(self.root.join(&file_name), &bytes)
            .await
            .map_err(|e| AppError::InternalFailure(format!("cannot write image: {e}")))?;

        tracing::debug!(file = %file_name, size = bytes.len(), "Stored venue image");
        Ok(format!("{UPLOADS_ROUTE}/{file_name}"))
    }

    async fn discard(&self, url: &str) -> Result<(), AppError> {
        let Some(name) = stored_name(url) else {
            return Ok(());
        };
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::InternalFailure(format!(
                "cannot remove image {name}: {e}"
            ))),
        }
    }
}

/// Keeps images in memory; used by tests and storage-less local runs.
#[derive(Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<String, Bytes>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, url: &str) -> Option<Bytes> {
        self.images.read().await.get(url).cloned()
    }

    pub async fn count(&self) -> usize {
        self.images.read().await.len()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn save(&self, content_type: &str, bytes: Bytes) -> Result<String, AppError> {
        let url = format!(
            "{UPLOADS_ROUTE}/{}.{}",
            Uuid::new_v4(),
            extension_for(content_type)?
        );
        self.images.write().await.insert(url.clone(), bytes);
        Ok(url)
    }

    async fn discard(&self, url: &str) -> Result<(), AppError> {
        self.images.write().await.remove(url);
        Ok(())
    }
}
