//! Album (image group) endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::AppState;
use crate::database::{GalleryStorage, GroupCreate, StorageError};
use crate::media::MediaStorage;

use super::types::{ApiData, ApiError, GroupCreateRequest, GroupDeleteBody, GroupItem};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new("Internal server error")),
    )
        .into_response()
}

pub async fn list<S, M>(State(state): State<AppState<S, M>>) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    match state.storage.groups_list().await {
        Ok(groups) => {
            let items: Vec<GroupItem> = groups.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(ApiData::new(items))).into_response()
        }
        Err(err) => {
            tracing::error!("Failed to list image groups: {err}");
            internal_error()
        }
    }
}

pub async fn create<S, M>(
    State(state): State<AppState<S, M>>,
    Json(payload): Json<GroupCreateRequest>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Group name is required")),
        )
            .into_response();
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Group name must be 100 characters or less")),
        )
            .into_response();
    }
    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Description must be 500 characters or less")),
        )
            .into_response();
    }
    let (date_start, date_end) = payload
        .date_range
        .map(|range| (range.start, range.end))
        .unwrap_or((None, None));

    let input = GroupCreate {
        name,
        description,
        date_start,
        date_end,
    };
    match state.storage.group_create(input).await {
        Ok(row) => (
            StatusCode::CREATED,
            Json(ApiData::with_message(
                GroupItem::from_row(row, 0),
                "Group created successfully",
            )),
        )
            .into_response(),
        // Uniqueness is enforced by the database, case-insensitively.
        Err(StorageError::Conflict(_)) => (
            StatusCode::CONFLICT,
            Json(ApiError::new("A group with this name already exists")),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to create image group: {err}");
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
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Invalid group ID format")),
        )
            .into_response();
    };
    match state.storage.group_delete(id).await {
        Ok(Some(detached_images)) => (
            StatusCode::OK,
            Json(ApiData::with_message(
                GroupDeleteBody {
                    id,
                    detached_images,
                },
                "Group deleted successfully",
            )),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Group not found")),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to delete image group {id}: {err}");
            internal_error()
        }
    }
}
