//! Cloudinary REST client.
//!
//! Uploads are signed: the parameters (minus `file` and `api_key`) are
//! sorted, joined as `k=v` pairs with `&`, suffixed with the API secret and
//! hashed with SHA-1.

use std::collections::BTreeMap;

use reqwest::multipart::{Form, Part};
use sha1::{Digest, Sha1};

use super::traits::MediaStorage;
use super::types::{MediaStorageError, MediaUpload, StoredMedia, UploadOptions};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone)]
pub struct CloudinaryMedia {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    default_folder: String,
}

#[derive(Debug, serde::Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    width: Option<i32>,
    height: Option<i32>,
    format: Option<String>,
    bytes: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryMedia {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        default_folder: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            default_folder: default_folder.into(),
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            config.cloudinary_cloud_name().unwrap_or_default(),
            config.cloudinary_api_key().unwrap_or_default(),
            config.cloudinary_api_secret().unwrap_or_default(),
            config.cloudinary_folder(),
        )
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{}/image/{action}", self.cloud_name)
    }

    /// Signable parameters for an upload: everything except `file` and
    /// `api_key`, with a fresh timestamp.
    fn upload_params(&self, options: &UploadOptions) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        let folder = options
            .folder
            .clone()
            .unwrap_or_else(|| self.default_folder.clone());
        if !folder.is_empty() {
            params.insert("folder".to_owned(), folder);
        }
        if !options.tags.is_empty() {
            params.insert("tags".to_owned(), options.tags.join(","));
        }
        if let Some(public_id) = &options.public_id {
            params.insert("public_id".to_owned(), public_id.clone());
        }
        params.insert(
            "timestamp".to_owned(),
            chrono::Utc::now().timestamp().to_string(),
        );
        params
    }

    fn sign(&self, params: &BTreeMap<String, String>) -> String {
        let joined = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let digest = Sha1::digest(format!("{joined}{}", self.api_secret).as_bytes());
        format!("{digest:x}")
    }

    async fn send_upload(&self, form: Form) -> Result<StoredMedia, MediaStorageError> {
        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|err| MediaStorageError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaStorageError::Rejected(format!("{status}: {body}")));
        }
        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|err| MediaStorageError::Rejected(err.to_string()))?;
        Ok(StoredMedia {
            storage_id: uploaded.public_id,
            url: uploaded.secure_url,
            width: uploaded.width,
            height: uploaded.height,
            format: uploaded.format,
            size_bytes: uploaded.bytes,
        })
    }
}

impl MediaStorage for CloudinaryMedia {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia, MediaStorageError> {
        let params = self.upload_params(&upload.options);
        let signature = self.sign(&params);

        let part = Part::bytes(upload.content)
            .file_name(upload.filename)
            .mime_str(&upload.content_type)
            .map_err(|err| MediaStorageError::Rejected(err.to_string()))?;
        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        self.send_upload(form).await
    }

    async fn upload_from_url(
        &self,
        url: &str,
        options: UploadOptions,
    ) -> Result<StoredMedia, MediaStorageError> {
        let params = self.upload_params(&options);
        let signature = self.sign(&params);

        let mut form = Form::new()
            .text("file", url.to_owned())
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        self.send_upload(form).await
    }

    async fn delete(&self, storage_id: &str) -> Result<(), MediaStorageError> {
        let mut params = BTreeMap::new();
        params.insert("public_id".to_owned(), storage_id.to_owned());
        params.insert(
            "timestamp".to_owned(),
            chrono::Utc::now().timestamp().to_string(),
        );
        let signature = self.sign(&params);

        let mut form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await
            .map_err(|err| MediaStorageError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaStorageError::Rejected(format!("{status}: {body}")));
        }
        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|err| MediaStorageError::Rejected(err.to_string()))?;
        match destroyed.result.as_str() {
            "ok" => Ok(()),
            "not found" => Err(MediaStorageError::NotFound(storage_id.to_owned())),
            other => Err(MediaStorageError::Rejected(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_over_sorted_params() {
        let media = CloudinaryMedia::new("demo", "key", "secret", "gallery");
        let mut params = BTreeMap::new();
        params.insert("timestamp".to_owned(), "1700000000".to_owned());
        params.insert("folder".to_owned(), "gallery".to_owned());
        // SHA-1 of "folder=gallery&timestamp=1700000000secret".
        let expected = {
            let digest = Sha1::digest(b"folder=gallery&timestamp=1700000000secret");
            format!("{digest:x}")
        };
        assert_eq!(media.sign(&params), expected);
    }

    #[test]
    fn test_upload_params_use_default_folder() {
        let media = CloudinaryMedia::new("demo", "key", "secret", "gallery");
        let params = media.upload_params(&UploadOptions::default());
        assert_eq!(params.get("folder").map(String::as_str), Some("gallery"));
        assert!(params.contains_key("timestamp"));
        assert!(!params.contains_key("tags"));
    }
}
