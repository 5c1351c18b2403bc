//! Image ingestion: multipart file batches and provider-side URL fetches.
//!
//! `POST /images/upload` accepts either `multipart/form-data` with one or
//! more `files` fields, or a JSON body naming a public image URL for the
//! provider to fetch itself. Files in a batch succeed or fail independently.

use axum::Json;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::AppState;
use crate::database::{GalleryStorage, ImageInsert};
use crate::media::{MediaStorage, MediaUpload, StoredMedia, UploadOptions};
use crate::query::parse_tag_list;

use super::types::{
    ApiData, ApiError, FieldError, ImageItem, UploadBatchBody, UploadFailureBody, UrlUploadRequest,
};

/// Per-file ceiling. Larger files are refused with 413.
pub const MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

/// Whole-request ceiling for a multipart batch.
pub const MAX_BODY_BYTES: usize = 120 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new("Internal server error")),
    )
        .into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiError::new(message))).into_response()
}

struct PendingFile {
    filename: String,
    content_type: String,
    content: Vec<u8>,
}

#[derive(Default)]
struct BatchMetadata {
    caption: Option<String>,
    group_id: Option<Uuid>,
    web_link_id: Option<Uuid>,
    tags: Vec<String>,
}

pub async fn upload<S, M>(State(state): State<AppState<S, M>>, request: Request) -> Response
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    if content_type.starts_with("multipart/form-data") {
        let multipart = match Multipart::from_request(request, &()).await {
            Ok(multipart) => multipart,
            Err(err) => return bad_request(format!("Malformed multipart body: {err}")),
        };
        upload_files(state, multipart).await
    } else if content_type.starts_with("application/json") {
        let payload = match Json::<UrlUploadRequest>::from_request(request, &()).await {
            Ok(Json(payload)) => payload,
            Err(err) => return bad_request(format!("Malformed JSON body: {err}")),
        };
        upload_from_url(state, payload).await
    } else {
        bad_request("Unsupported content type")
    }
}

/// Resolve an optional raw group id, requiring the group to exist.
async fn resolve_group<S>(storage: &S, raw: Option<&str>) -> Result<Option<Uuid>, Response>
where
    S: GalleryStorage,
{
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let Ok(id) = raw.parse::<Uuid>() else {
        return Err(bad_request("Invalid group ID format"));
    };
    match storage.group_get(id).await {
        Ok(Some(_)) => Ok(Some(id)),
        Ok(None) => Err(bad_request("Group not found")),
        Err(err) => {
            tracing::error!("Failed to fetch group {id}: {err}");
            Err(internal_error())
        }
    }
}

async fn resolve_web_link<S>(storage: &S, raw: Option<&str>) -> Result<Option<Uuid>, Response>
where
    S: GalleryStorage,
{
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let Ok(id) = raw.parse::<Uuid>() else {
        return Err(bad_request("Invalid web link ID format"));
    };
    match storage.web_link_get(id).await {
        Ok(Some(_)) => Ok(Some(id)),
        Ok(None) => Err(bad_request("Web link not found")),
        Err(err) => {
            tracing::error!("Failed to fetch web link {id}: {err}");
            Err(internal_error())
        }
    }
}

async fn upload_files<S, M>(state: AppState<S, M>, mut multipart: Multipart) -> Response
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let mut files: Vec<PendingFile> = Vec::new();
    let mut caption = None;
    let mut group_raw: Option<String> = None;
    let mut web_link_raw: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return bad_request(format!("Malformed multipart body: {err}")),
        };
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "files" | "file" => {
                let filename = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let content = match field.bytes().await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(err) => {
                        return bad_request(format!("Failed to read file {filename}: {err}"));
                    }
                };
                files.push(PendingFile {
                    filename,
                    content_type,
                    content,
                });
            }
            "caption" => match field.text().await {
                Ok(text) => caption = Some(text),
                Err(err) => return bad_request(format!("Malformed multipart body: {err}")),
            },
            "groupId" => match field.text().await {
                Ok(text) => group_raw = Some(text),
                Err(err) => return bad_request(format!("Malformed multipart body: {err}")),
            },
            "webLinkId" => match field.text().await {
                Ok(text) => web_link_raw = Some(text),
                Err(err) => return bad_request(format!("Malformed multipart body: {err}")),
            },
            "tags" => match field.text().await {
                Ok(text) => tags = parse_tag_list(&text),
                Err(err) => return bad_request(format!("Malformed multipart body: {err}")),
            },
            _ => {}
        }
    }

    if files.is_empty() {
        return bad_request("No files provided");
    }
    if caption
        .as_deref()
        .is_some_and(|c| c.chars().count() > super::images::MAX_CAPTION_CHARS)
    {
        return bad_request("Caption must be 500 characters or less");
    }
    for file in &files {
        if !ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str()) {
            return bad_request(format!(
                "Invalid file type for {}: only JPEG, PNG, WebP and GIF are accepted",
                file.filename
            ));
        }
        if file.content.len() > MAX_FILE_BYTES {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ApiError::new(format!(
                    "File {} is too large (max 20MB)",
                    file.filename
                ))),
            )
                .into_response();
        }
    }

    let metadata = BatchMetadata {
        caption,
        group_id: match resolve_group(&state.storage, group_raw.as_deref()).await {
            Ok(id) => id,
            Err(response) => return response,
        },
        web_link_id: match resolve_web_link(&state.storage, web_link_raw.as_deref()).await {
            Ok(id) => id,
            Err(response) => return response,
        },
        tags,
    };

    let batch_stamp = Utc::now().timestamp_millis();
    let total = files.len();
    let mut join_set = JoinSet::new();
    for (index, file) in files.into_iter().enumerate() {
        let storage = state.storage.clone();
        let media = state.media.clone();
        let caption = metadata.caption.clone();
        let tags = metadata.tags.clone();
        let group_id = metadata.group_id;
        let web_link_id = metadata.web_link_id;
        join_set.spawn(async move {
            let result = store_one(
                &storage,
                &media,
                file,
                caption,
                group_id,
                web_link_id,
                tags,
                format!("img_{batch_stamp}_{index}"),
            )
            .await;
            (index, result)
        });
    }

    let mut uploaded: Vec<(usize, ImageItem)> = Vec::new();
    let mut failed: Vec<UploadFailureBody> = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, Ok(item))) => uploaded.push((index, item)),
            Ok((_, Err(failure))) => failed.push(failure),
            Err(err) => {
                tracing::error!("Upload task panicked: {err}");
                return internal_error();
            }
        }
    }
    uploaded.sort_by_key(|(index, _)| *index);
    let images: Vec<ImageItem> = uploaded.into_iter().map(|(_, item)| item).collect();

    if images.is_empty() {
        let details = failed
            .into_iter()
            .map(|f| FieldError::new(f.filename, f.error))
            .collect();
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::with_details("All uploads failed", details)),
        )
            .into_response();
    }

    let count = images.len();
    (
        StatusCode::CREATED,
        Json(ApiData::with_message(
            UploadBatchBody {
                images,
                count,
                failed,
            },
            format!("Uploaded {count} of {total} images"),
        )),
    )
        .into_response()
}

#[allow(clippy::too_many_arguments)]
async fn store_one<S, M>(
    storage: &S,
    media: &M,
    file: PendingFile,
    caption: Option<String>,
    group_id: Option<Uuid>,
    web_link_id: Option<Uuid>,
    tags: Vec<String>,
    public_id: String,
) -> Result<ImageItem, UploadFailureBody>
where
    S: GalleryStorage,
    M: MediaStorage,
{
    // The provider copy carries an extra marker tag; the record keeps the
    // user's tags as given.
    let mut provider_tags = tags.clone();
    provider_tags.push("uploaded".to_owned());
    let filename = file.filename.clone();
    let stored = media
        .upload(MediaUpload {
            content: file.content,
            filename: filename.clone(),
            content_type: file.content_type,
            options: UploadOptions {
                folder: None,
                tags: provider_tags,
                public_id: Some(public_id),
            },
        })
        .await
        .map_err(|err| UploadFailureBody {
            filename: filename.clone(),
            error: err.to_string(),
        })?;

    let caption = caption.unwrap_or_else(|| filename_stem(&filename));
    persist_stored(
        storage,
        media,
        stored,
        caption,
        group_id,
        web_link_id,
        tags,
        Some(filename.clone()),
    )
    .await
    .map_err(|error| UploadFailureBody { filename, error })
}

fn filename_stem(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename)
        .to_owned()
}

/// Insert the database record for an already-stored asset. If the insert
/// fails the provider copy is removed again, best effort.
#[allow(clippy::too_many_arguments)]
async fn persist_stored<S, M>(
    storage: &S,
    media: &M,
    stored: StoredMedia,
    caption: String,
    group_id: Option<Uuid>,
    web_link_id: Option<Uuid>,
    tags: Vec<String>,
    original_filename: Option<String>,
) -> Result<ImageItem, String>
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let storage_id = stored.storage_id.clone();
    let insert = ImageInsert {
        url: stored.url,
        storage_id: stored.storage_id,
        caption,
        group_id,
        web_link_id,
        taken_at: Utc::now(),
        width: stored.width,
        height: stored.height,
        format: stored.format,
        size_bytes: stored.size_bytes,
        original_filename,
        tags,
    };
    match storage.image_insert(insert).await {
        Ok(row) => Ok(ImageItem::from(row)),
        Err(err) => {
            tracing::error!("Failed to record uploaded image {storage_id}: {err}");
            if let Err(cleanup) = media.delete(&storage_id).await {
                tracing::warn!("Failed to remove orphaned media asset {storage_id}: {cleanup}");
            }
            Err(err.to_string())
        }
    }
}

async fn upload_from_url<S, M>(state: AppState<S, M>, payload: UrlUploadRequest) -> Response
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let Some(image_url) = payload
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        return bad_request("Image URL is required");
    };
    let is_http = matches!(
        url::Url::parse(image_url).map(|u| u.scheme().to_owned()),
        Ok(scheme) if scheme == "http" || scheme == "https"
    );
    if !is_http {
        return bad_request("Invalid URL format");
    }

    let caption = payload
        .caption
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("Uploaded from URL")
        .to_owned();
    if caption.chars().count() > super::images::MAX_CAPTION_CHARS {
        return bad_request("Caption must be 500 characters or less");
    }

    let group_id = match resolve_group(&state.storage, payload.group_id.as_deref()).await {
        Ok(id) => id,
        Err(response) => return response,
    };
    let tags = payload
        .tags
        .as_deref()
        .map(crate::query::normalize_tags)
        .unwrap_or_default();
    let mut provider_tags = tags.clone();
    provider_tags.push("url-upload".to_owned());

    let options = UploadOptions {
        folder: None,
        tags: provider_tags,
        public_id: Some(format!("url_img_{}", Utc::now().timestamp_millis())),
    };
    let stored = match state.media.upload_from_url(image_url, options).await {
        Ok(stored) => stored,
        Err(err) => {
            tracing::error!("Failed to fetch image from URL: {err}");
            return (
                StatusCode::BAD_GATEWAY,
                Json(ApiError::new("Failed to fetch image from URL")),
            )
                .into_response();
        }
    };

    match persist_stored(
        &state.storage,
        &state.media,
        stored,
        caption,
        group_id,
        None,
        tags,
        Some("from-url".to_owned()),
    )
    .await
    {
        Ok(item) => (
            StatusCode::CREATED,
            Json(ApiData::with_message(item, "Image uploaded successfully")),
        )
            .into_response(),
        Err(_) => internal_error(),
    }
}
