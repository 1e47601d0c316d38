//! Blob storage capability and media helpers
//!
//! A second, independent transport seam: anything that can store bytes at a
//! path and hand back download URLs can sit behind [`BlobStore`].
//! [`MediaStore`] layers the media conventions on top (short generated
//! filenames, JPEG content type, URL resolution).

use std::future::Future;

use futures::future::join_all;

use crate::error::SyncError;

/// Capability interface over a blob store keyed by path.
pub trait BlobStore: Send + Sync + 'static {
    /// Store bytes at a path with the given content type
    fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// List every stored path under a prefix
    fn list(&self, prefix: &str) -> impl Future<Output = Result<Vec<String>, SyncError>> + Send;

    /// Resolve a stored path to a download URL
    fn download_url(&self, path: &str) -> impl Future<Output = Result<String, SyncError>> + Send;
}

/// Media upload conventions over any [`BlobStore`].
pub struct MediaStore<B: BlobStore> {
    store: B,
}

impl<B: BlobStore> MediaStore<B> {
    /// Create a media store over the given blob store
    pub fn new(store: B) -> Self {
        Self { store }
    }

    /// Get the underlying blob store handle
    pub fn store(&self) -> &B {
        &self.store
    }

    /// Upload a JPEG image into a directory and return its download URL.
    ///
    /// The file name is a generated short lowercase UID with a `.jpg`
    /// extension, so repeated uploads never collide on name.
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        directory: &str,
    ) -> Result<String, SyncError> {
        let file_name = format!("{}.jpg", short_uid(6));
        let path = format!("{directory}/{file_name}");
        self.store.put(&path, bytes, "image/jpeg").await?;
        self.store.download_url(&path).await
    }

    /// List a bucket prefix and resolve every item to a download URL.
    ///
    /// URLs are resolved concurrently; items that fail to resolve are
    /// skipped rather than failing the whole listing.
    pub async fn fetch_bucket(&self, prefix: &str) -> Result<Vec<String>, SyncError> {
        let paths = self.store.list(prefix).await?;
        let resolved = join_all(paths.iter().map(|path| self.store.download_url(path))).await;
        Ok(resolved.into_iter().filter_map(Result::ok).collect())
    }
}

fn short_uid(len: usize) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    hex[..len].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_uid_is_lowercase_hex() {
        let uid = short_uid(6);
        assert_eq!(uid.len(), 6);
        assert!(uid.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_short_uids_differ() {
        assert_ne!(short_uid(12), short_uid(12));
    }
}
