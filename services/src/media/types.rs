#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Provider folder. `None` uses the provider's configured default.
    pub folder: Option<String>,
    pub tags: Vec<String>,
    /// Stable identifier to store under. `None` lets the provider pick one.
    pub public_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub content: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    pub options: UploadOptions,
}

/// What the provider reports back after storing an asset.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub storage_id: String,
    pub url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub format: Option<String>,
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MediaStorageError {
    /// The provider received the request but refused it.
    #[error("media provider rejected the request: {0}")]
    Rejected(String),
    /// The request never completed.
    #[error("media provider unreachable: {0}")]
    Transport(String),
    #[error("media asset not found: {0}")]
    NotFound(String),
}
