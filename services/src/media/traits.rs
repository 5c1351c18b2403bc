use std::future::Future;

use super::types::{MediaStorageError, MediaUpload, StoredMedia, UploadOptions};

/// External media storage provider.
pub trait MediaStorage: Clone + Send + Sync + 'static {
    /// Store raw image bytes and return where they live.
    fn upload(
        &self,
        upload: MediaUpload,
    ) -> impl Future<Output = Result<StoredMedia, MediaStorageError>> + Send;

    /// Have the provider fetch an image from a public URL itself.
    fn upload_from_url(
        &self,
        url: &str,
        options: UploadOptions,
    ) -> impl Future<Output = Result<StoredMedia, MediaStorageError>> + Send;

    fn delete(
        &self,
        storage_id: &str,
    ) -> impl Future<Output = Result<(), MediaStorageError>> + Send;
}
