//! Storage for uploaded images.
//!
//! Keys are relative, `/`-separated paths such as `posts/cat.png`. Backends
//! never overwrite: storing under a taken key fails with
//! [`AppError::Conflict`] so callers can pick another name.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::{AppError, AppResult};

/// A file written to storage.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key.
    pub key: String,
    /// Public URL of the file.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub content_type: String,
    /// Hex MD5 digest of the contents.
    pub md5: String,
}

/// Where uploaded files live.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `data` under a key that must not be taken yet.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Remove a file. Missing files are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// URL the file is served from.
    fn public_url(&self, key: &str) -> String;

    /// Whether a file is stored under `key`.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Files under a directory on the local disk, served from a URL prefix.
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    /// Store under `root`, serving from `url_prefix`.
    #[must_use]
    pub const fn new(root: PathBuf, url_prefix: String) -> Self {
        Self { root, url_prefix }
    }

    /// Directory files are written under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, refusing keys that would leave it.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let contained = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if contained {
            Ok(self.root.join(relative))
        } else {
            Err(AppError::BadRequest(format!("Invalid storage key: {key}")))
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.resolve(key)?;

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Storage(format!("Cannot create {}: {e}", dir.display())))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => AppError::Conflict(format!("Key already stored: {key}")),
                _ => AppError::Storage(format!("Cannot open {}: {e}", path.display())),
            })?;

        file.write_all(data).await.map_err(|e| {
            AppError::Storage(format!("Cannot write {}: {e}", path.display()))
        })?;
        file.flush()
            .await
            .map_err(|e| AppError::Storage(format!("Cannot flush {}: {e}", path.display())))?;

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5: format!("{:x}", md5::compute(data)),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Cannot remove {}: {e}",
                path.display()
            ))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.url_prefix.trim_end_matches('/'))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.resolve(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot stat {}: {e}", path.display())))
    }
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts are dropped, anything outside `[A-Za-z0-9._-]` becomes `_`,
/// and an empty or dot-only result falls back to `upload`.
#[must_use]
pub fn sanitize_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Insert `suffix` before the extension of `file_name`.
#[must_use]
pub fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => format!("{}_{}{}", &file_name[..pos], suffix, &file_name[pos..]),
        _ => format!("{file_name}_{suffix}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_storage() -> LocalStorage {
        let root = std::env::temp_dir().join(format!("quill-storage-{}", uuid::Uuid::new_v4()));
        LocalStorage::new(root, "/media".to_string())
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\cat.png"), "cat.png");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("фото.gif"), "____.gif");
    }

    #[test]
    fn test_sanitize_fallback() {
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("dir/"), "upload");
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("cat.png", "a1b2c3d"), "cat_a1b2c3d.png");
        assert_eq!(with_suffix("archive.tar.gz", "x"), "archive.tar_x.gz");
        assert_eq!(with_suffix("README", "x"), "README_x");
        assert_eq!(with_suffix(".hidden", "x"), ".hidden_x");
    }

    #[test]
    fn test_public_url_joins_cleanly() {
        let storage = LocalStorage::new(PathBuf::from("./media"), "/media/".to_string());
        assert_eq!(storage.public_url("posts/cat.png"), "/media/posts/cat.png");
    }

    #[test]
    fn test_keys_stay_under_root() {
        let storage = LocalStorage::new(PathBuf::from("/srv/media"), "/media".to_string());
        assert_eq!(
            storage.resolve("posts/cat.png").unwrap(),
            PathBuf::from("/srv/media/posts/cat.png")
        );
        assert!(storage.resolve("../secret").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("").is_err());
    }

    #[tokio::test]
    async fn test_upload_exists_delete() {
        let storage = temp_storage();

        let file = storage
            .upload("posts/tiny.gif", b"GIF89a", "image/gif")
            .await
            .unwrap();
        assert_eq!(file.size, 6);
        assert_eq!(file.url, "/media/posts/tiny.gif");
        assert_eq!(file.md5, format!("{:x}", md5::compute(b"GIF89a")));
        assert!(storage.exists("posts/tiny.gif").await.unwrap());

        storage.delete("posts/tiny.gif").await.unwrap();
        assert!(!storage.exists("posts/tiny.gif").await.unwrap());
        storage.delete("posts/tiny.gif").await.unwrap();

        tokio::fs::remove_dir_all(storage.root()).await.ok();
    }

    #[tokio::test]
    async fn test_upload_never_overwrites() {
        let storage = temp_storage();
        storage.upload("posts/a.gif", b"first", "image/gif").await.unwrap();

        let err = storage
            .upload("posts/a.gif", b"second", "image/gif")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        let kept = tokio::fs::read(storage.root().join("posts/a.gif")).await.unwrap();
        assert_eq!(kept, b"first");

        tokio::fs::remove_dir_all(storage.root()).await.ok();
    }
}
