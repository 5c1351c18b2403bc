//! Image listing and single-image endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::AppState;
use crate::database::{GalleryStorage, ImagePatch, StorageError};
use crate::media::MediaStorage;
use crate::pagination::page_info;
use crate::query::{ImageListSelection, normalize_tags};

use super::types::{
    ApiData, ApiError, DeleteImageBody, DeletedFrom, FavoriteBody, FavoriteStateBody,
    GroupAssignBody, GroupAssignRequest, ImageItem, ImagePagination, ImageUpdateRequest,
    ImagesListBody, ImagesListQuery,
};

pub const MAX_CAPTION_CHARS: usize = 500;

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new("Internal server error")),
    )
        .into_response()
}

fn invalid_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new("Invalid image ID format")),
    )
        .into_response()
}

fn image_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new("Image not found")),
    )
        .into_response()
}

/// The target group of a patch, as requested by the client.
enum GroupTarget {
    Unchanged,
    Clear,
    Assign(Uuid),
}

fn parse_group_target(raw: Option<&str>) -> Result<GroupTarget, Response> {
    match raw {
        None => Ok(GroupTarget::Unchanged),
        Some("ungrouped") => Ok(GroupTarget::Clear),
        Some(raw) => match raw.parse::<Uuid>() {
            Ok(id) => Ok(GroupTarget::Assign(id)),
            Err(_) => Err((
                StatusCode::BAD_REQUEST,
                Json(ApiError::new("Invalid group ID format")),
            )
                .into_response()),
        },
    }
}

pub async fn list<S, M>(
    State(state): State<AppState<S, M>>,
    Query(query): Query<ImagesListQuery>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let selection = match ImageListSelection::build(query.into()) {
        Ok(selection) => selection,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, Json(ApiError::new(err.to_string())))
                .into_response();
        }
    };

    let (rows, total) = match state.storage.images_page(&selection).await {
        Ok(page) => page,
        Err(err) => {
            tracing::error!("Failed to list images: {err}");
            return internal_error();
        }
    };
    // Every listing carries the album facet so the client can render group
    // filters without a second request.
    let groups = match state.storage.groups_list().await {
        Ok(groups) => groups,
        Err(err) => {
            tracing::error!("Failed to list image groups: {err}");
            return internal_error();
        }
    };

    let pagination =
        ImagePagination::from_page(page_info(total, selection.page, selection.limit), total);
    (
        StatusCode::OK,
        Json(ApiData::new(ImagesListBody {
            images: rows.into_iter().map(ImageItem::from).collect(),
            groups: groups.into_iter().map(Into::into).collect(),
            pagination,
        })),
    )
        .into_response()
}

pub async fn get<S, M>(
    State(state): State<AppState<S, M>>,
    Path(id): Path<String>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let Ok(id) = id.parse::<Uuid>() else {
        return invalid_id();
    };
    match state.storage.image_get(id).await {
        Ok(Some(row)) => {
            (StatusCode::OK, Json(ApiData::new(ImageItem::from(row)))).into_response()
        }
        Ok(None) => image_not_found(),
        Err(err) => {
            tracing::error!("Failed to fetch image {id}: {err}");
            internal_error()
        }
    }
}

pub async fn update<S, M>(
    State(state): State<AppState<S, M>>,
    Path(id): Path<String>,
    Json(payload): Json<ImageUpdateRequest>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let Ok(id) = id.parse::<Uuid>() else {
        return invalid_id();
    };

    let caption = match payload.caption {
        Some(raw) => {
            let caption = raw.trim().to_owned();
            if caption.chars().count() > MAX_CAPTION_CHARS {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiError::new("Caption must be 500 characters or less")),
                )
                    .into_response();
            }
            Some(caption)
        }
        None => None,
    };

    let group = match parse_group_target(payload.group_id.as_deref()) {
        Ok(GroupTarget::Unchanged) => None,
        Ok(GroupTarget::Clear) => Some(None),
        Ok(GroupTarget::Assign(group_id)) => {
            match state.storage.group_get(group_id).await {
                Ok(Some(_)) => Some(Some(group_id)),
                Ok(None) => {
                    return (
                        StatusCode::NOT_FOUND,
                        Json(ApiError::new("Group not found")),
                    )
                        .into_response();
                }
                Err(err) => {
                    tracing::error!("Failed to fetch group {group_id}: {err}");
                    return internal_error();
                }
            }
        }
        Err(response) => return response,
    };

    let patch = ImagePatch {
        caption,
        group,
        tags: payload.tags.map(normalize_tags),
    };
    if patch.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("No updatable fields provided")),
        )
            .into_response();
    }

    match state.storage.image_update(id, patch).await {
        Ok(Some(row)) => {
            (StatusCode::OK, Json(ApiData::new(ImageItem::from(row)))).into_response()
        }
        Ok(None) => image_not_found(),
        // The group can vanish between the existence check and the write.
        Err(StorageError::MissingReference(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Group not found")),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to update image {id}: {err}");
            internal_error()
        }
    }
}

pub async fn assign_group<S, M>(
    State(state): State<AppState<S, M>>,
    Path(id): Path<String>,
    Json(payload): Json<GroupAssignRequest>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let Ok(id) = id.parse::<Uuid>() else {
        return invalid_id();
    };

    let group = match parse_group_target(payload.group_id.as_deref()) {
        Ok(GroupTarget::Unchanged) => {
            // No target given: report the current assignment unchanged.
            return match state.storage.image_get(id).await {
                Ok(Some(row)) => (
                    StatusCode::OK,
                    Json(ApiData::new(GroupAssignBody {
                        id: row.id,
                        group: row.group_id,
                    })),
                )
                    .into_response(),
                Ok(None) => image_not_found(),
                Err(err) => {
                    tracing::error!("Failed to fetch image {id}: {err}");
                    internal_error()
                }
            };
        }
        Ok(GroupTarget::Clear) => None,
        Ok(GroupTarget::Assign(group_id)) => match state.storage.group_get(group_id).await {
            Ok(Some(_)) => Some(group_id),
            Ok(None) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(ApiError::new("Group not found")),
                )
                    .into_response();
            }
            Err(err) => {
                tracing::error!("Failed to fetch group {group_id}: {err}");
                return internal_error();
            }
        },
        Err(response) => return response,
    };

    let patch = ImagePatch {
        group: Some(group),
        ..ImagePatch::default()
    };
    match state.storage.image_update(id, patch).await {
        Ok(Some(row)) => (
            StatusCode::OK,
            Json(ApiData::new(GroupAssignBody {
                id: row.id,
                group: row.group_id,
            })),
        )
            .into_response(),
        Ok(None) => image_not_found(),
        Err(StorageError::MissingReference(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Group not found")),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to assign group for image {id}: {err}");
            internal_error()
        }
    }
}

pub async fn toggle_favorite<S, M>(
    State(state): State<AppState<S, M>>,
    Path(id): Path<String>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let Ok(id) = id.parse::<Uuid>() else {
        return invalid_id();
    };
    match state.storage.image_toggle_favorite(id).await {
        Ok(Some(row)) => (
            StatusCode::OK,
            Json(ApiData::new(FavoriteBody::from(row))),
        )
            .into_response(),
        Ok(None) => image_not_found(),
        Err(err) => {
            tracing::error!("Failed to toggle favorite for image {id}: {err}");
            internal_error()
        }
    }
}

pub async fn favorite_state<S, M>(
    State(state): State<AppState<S, M>>,
    Path(id): Path<String>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let Ok(id) = id.parse::<Uuid>() else {
        return invalid_id();
    };
    match state.storage.image_get(id).await {
        Ok(Some(row)) => (
            StatusCode::OK,
            Json(ApiData::new(FavoriteStateBody {
                id: row.id,
                is_favorite: row.is_favorite,
            })),
        )
            .into_response(),
        Ok(None) => image_not_found(),
        Err(err) => {
            tracing::error!("Failed to fetch image {id}: {err}");
            internal_error()
        }
    }
}

pub async fn remove<S, M>(
    State(state): State<AppState<S, M>>,
    Path(id): Path<String>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let Ok(id) = id.parse::<Uuid>() else {
        return invalid_id();
    };
    let image = match state.storage.image_get(id).await {
        Ok(Some(row)) => row,
        Ok(None) => return image_not_found(),
        Err(err) => {
            tracing::error!("Failed to fetch image {id}: {err}");
            return internal_error();
        }
    };

    // The provider copy goes first, best effort. A failure there still
    // removes the record so the gallery stays consistent.
    let provider_deleted = match state.media.delete(&image.storage_id).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                "Failed to delete media asset {}: {err}",
                image.storage_id
            );
            false
        }
    };

    match state.storage.image_delete(id).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiData::new(DeleteImageBody {
                id,
                deleted_from: DeletedFrom {
                    cloudinary: provider_deleted,
                    database: true,
                },
            })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to delete image {id}: {err}");
            internal_error()
        }
    }
}
