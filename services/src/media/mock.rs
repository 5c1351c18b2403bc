//! In-memory [`MediaStorage`] for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::traits::MediaStorage;
use super::types::{MediaStorageError, MediaUpload, StoredMedia, UploadOptions};

#[derive(Debug, Clone)]
pub struct MockMedia {
    pub url: String,
    pub tags: Vec<String>,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MockMediaStorage {
    assets: Arc<RwLock<HashMap<String, MockMedia>>>,
    counter: Arc<AtomicU64>,
    fail_deletes: Arc<AtomicBool>,
    reject_filenames_containing: Arc<RwLock<Option<String>>>,
}

impl MockMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delete fail with a transport error.
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    /// Reject uploads whose filename contains `needle`.
    pub fn reject_filenames_containing(&self, needle: impl Into<String>) {
        *self
            .reject_filenames_containing
            .write()
            .expect("lock poisoned") = Some(needle.into());
    }

    pub fn len(&self) -> usize {
        self.assets.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, storage_id: &str) -> bool {
        self.assets
            .read()
            .expect("lock poisoned")
            .contains_key(storage_id)
    }

    /// Snapshot of a stored asset, for asserting what reached the provider.
    pub fn asset(&self, storage_id: &str) -> Option<MockMedia> {
        self.assets
            .read()
            .expect("lock poisoned")
            .get(storage_id)
            .cloned()
    }

    fn store(&self, options: &UploadOptions, tags: Vec<String>, size_bytes: i64) -> StoredMedia {
        let storage_id = match &options.public_id {
            Some(public_id) => {
                let folder = options.folder.as_deref().unwrap_or("gallery");
                format!("{folder}/{public_id}")
            }
            None => format!("gallery/mock-{}", self.counter.fetch_add(1, Ordering::SeqCst)),
        };
        let url = format!("https://media.invalid/{storage_id}.jpg");
        self.assets.write().expect("lock poisoned").insert(
            storage_id.clone(),
            MockMedia {
                url: url.clone(),
                tags,
                size_bytes,
            },
        );
        StoredMedia {
            storage_id,
            url,
            width: Some(800),
            height: Some(600),
            format: Some("jpg".to_owned()),
            size_bytes: Some(size_bytes),
        }
    }
}

impl MediaStorage for MockMediaStorage {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia, MediaStorageError> {
        let reject = self
            .reject_filenames_containing
            .read()
            .expect("lock poisoned")
            .clone();
        if let Some(needle) = reject {
            if upload.filename.contains(&needle) {
                return Err(MediaStorageError::Rejected(format!(
                    "rejected by test fixture: {}",
                    upload.filename
                )));
            }
        }
        let size = upload.content.len() as i64;
        Ok(self.store(&upload.options, upload.options.tags.clone(), size))
    }

    async fn upload_from_url(
        &self,
        _url: &str,
        options: UploadOptions,
    ) -> Result<StoredMedia, MediaStorageError> {
        let tags = options.tags.clone();
        Ok(self.store(&options, tags, 0))
    }

    async fn delete(&self, storage_id: &str) -> Result<(), MediaStorageError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(MediaStorageError::Transport(
                "simulated provider outage".to_owned(),
            ));
        }
        // Deleting an unknown asset is treated as already gone.
        self.assets
            .write()
            .expect("lock poisoned")
            .remove(storage_id);
        Ok(())
    }
}
