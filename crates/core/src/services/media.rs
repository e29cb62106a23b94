//! Media service: storing uploaded post images.

use std::sync::Arc;

use quill_common::{AppError, AppResult, IdGenerator, StorageBackend, sanitize_file_name, with_suffix};
use tracing::{debug, info};

use crate::forms::ImageUpload;

/// Key prefix for post images.
pub const POST_IMAGE_PREFIX: &str = "posts";

const MAX_NAME_ATTEMPTS: u32 = 5;

/// Media service for business logic.
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store a post image and return its storage key.
    ///
    /// An existing file is never overwritten; a taken name gets a random suffix.
    pub async fn store_post_image(&self, upload: &ImageUpload) -> AppResult<String> {
        let file_name = sanitize_file_name(&upload.file_name);
        let content_type = upload
            .content_type
            .clone()
            .or_else(|| {
                image::guess_format(&upload.data)
                    .ok()
                    .map(|format| format.to_mime_type().to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut key = format!("{POST_IMAGE_PREFIX}/{file_name}");
        let mut attempts = 0;
        let stored = loop {
            match self.storage.upload(&key, &upload.data, &content_type).await {
                Ok(stored) => break stored,
                Err(AppError::Conflict(_)) if attempts < MAX_NAME_ATTEMPTS => {
                    attempts += 1;
                    let suffixed = with_suffix(&file_name, &self.id_gen.generate_suffix());
                    debug!(taken = %key, "Image name taken, retrying with suffix");
                    key = format!("{POST_IMAGE_PREFIX}/{suffixed}");
                }
                Err(e) => return Err(e),
            }
        };

        info!(key = %stored.key, size = stored.size, md5 = %stored.md5, "Stored post image");
        Ok(stored.key)
    }

    /// Remove a stored image.
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        self.storage.delete(key).await
    }

    /// Public URL of a stored image.
    #[must_use]
    pub fn url(&self, key: &str) -> String {
        self.storage.public_url(key)
    }
}
