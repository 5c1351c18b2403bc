//! Web link (bookmark) endpoints.

use std::sync::LazyLock;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use regex::Regex;
use uuid::Uuid;

use crate::AppState;
use crate::database::{GalleryStorage, StorageError, WebLinkCreate, WebLinkWithImages};
use crate::media::MediaStorage;
use crate::pagination::offset_info;
use crate::query::{SelectionError, WebLinkListSelection, is_known_category, normalize_tags};

use super::types::{
    ApiData, ApiError, FieldError, VisitBody, VisitQuery, WebLinkCreateRequest, WebLinkItem,
    WebLinksListBody, WebLinksListQuery,
};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_CHARS: usize = 50;

const DEFAULT_BACKGROUND_COLOR: &str = "#ec4899";
const DEFAULT_TEXT_COLOR: &str = "#ffffff";

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern is valid"));

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new("Internal server error")),
    )
        .into_response()
}

fn is_http_url(raw: &str) -> bool {
    matches!(
        url::Url::parse(raw).map(|u| u.scheme().to_owned()),
        Ok(scheme) if scheme == "http" || scheme == "https"
    )
}

fn selection_field(err: SelectionError) -> &'static str {
    match err {
        SelectionError::InvalidPage => "page",
        SelectionError::InvalidLimit => "limit",
        SelectionError::InvalidOffset => "offset",
        SelectionError::InvalidDate(field) => field,
        SelectionError::InvalidCategory => "category",
        SelectionError::InvalidSortKey => "sortBy",
    }
}

pub async fn list<S, M>(
    State(state): State<AppState<S, M>>,
    Query(query): Query<WebLinksListQuery>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let selection = match WebLinkListSelection::build(query.into()) {
        Ok(selection) => selection,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::with_details(
                    "Invalid query parameters",
                    vec![FieldError::new(selection_field(err), err.to_string())],
                )),
            )
                .into_response();
        }
    };

    let (links, total) = match state.storage.web_links_page(&selection).await {
        Ok(page) => page,
        Err(err) => {
            tracing::error!("Failed to list web links: {err}");
            return internal_error();
        }
    };
    // Statistics ride along with every listing, over active links only.
    let statistics = match state.storage.web_link_statistics().await {
        Ok(stats) => stats,
        Err(err) => {
            tracing::error!("Failed to aggregate web link statistics: {err}");
            return internal_error();
        }
    };

    let pagination = offset_info(total, selection.limit, selection.offset);
    (
        StatusCode::OK,
        Json(ApiData::new(WebLinksListBody {
            web_links: links.into_iter().map(WebLinkItem::from).collect(),
            pagination: pagination.into(),
            statistics: statistics.into(),
        })),
    )
        .into_response()
}

fn validate_create(payload: &WebLinkCreateRequest) -> Result<WebLinkCreate, Vec<FieldError>> {
    let mut details = Vec::new();

    let title = payload.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        details.push(FieldError::new("title", "Title is required"));
    } else if title.chars().count() > MAX_TITLE_CHARS {
        details.push(FieldError::new(
            "title",
            "Title must be 200 characters or less",
        ));
    }

    let url = payload.url.as_deref().map(str::trim).unwrap_or_default();
    if url.is_empty() {
        details.push(FieldError::new("url", "URL is required"));
    } else if !is_http_url(url) {
        details.push(FieldError::new("url", "URL must be a valid http(s) URL"));
    }

    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        details.push(FieldError::new(
            "description",
            "Description must be 1000 characters or less",
        ));
    }

    let raw_tags = payload.tags.as_deref().unwrap_or_default();
    if raw_tags.len() > MAX_TAGS {
        details.push(FieldError::new("tags", "At most 20 tags are allowed"));
    }
    for tag in raw_tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_TAG_CHARS {
            details.push(FieldError::new(
                "tags",
                "Each tag must be between 1 and 50 characters",
            ));
            break;
        }
    }

    let category = payload.category.as_deref().unwrap_or("memories");
    if !is_known_category(category) {
        details.push(FieldError::new("category", "Unknown category"));
    }

    let background_color = payload
        .background_color
        .as_deref()
        .unwrap_or(DEFAULT_BACKGROUND_COLOR);
    if !HEX_COLOR.is_match(background_color) {
        details.push(FieldError::new(
            "backgroundColor",
            "Must be a hex color like #ec4899",
        ));
    }
    let text_color = payload.text_color.as_deref().unwrap_or(DEFAULT_TEXT_COLOR);
    if !HEX_COLOR.is_match(text_color) {
        details.push(FieldError::new(
            "textColor",
            "Must be a hex color like #ffffff",
        ));
    }

    let metadata = payload.metadata.as_ref();
    if let Some(favicon) = metadata.and_then(|m| m.favicon.as_deref()) {
        if !is_http_url(favicon) {
            details.push(FieldError::new("metadata.favicon", "Must be a valid URL"));
        }
    }
    if let Some(preview) = metadata.and_then(|m| m.preview_image.as_deref()) {
        if !is_http_url(preview) {
            details.push(FieldError::new(
                "metadata.previewImage",
                "Must be a valid URL",
            ));
        }
    }

    if !details.is_empty() {
        return Err(details);
    }

    Ok(WebLinkCreate {
        title: title.to_owned(),
        url: url.to_owned(),
        description: description.to_owned(),
        tags: normalize_tags(raw_tags),
        category: category.to_owned(),
        background_color: background_color.to_owned(),
        text_color: text_color.to_owned(),
        site_name: metadata.and_then(|m| m.site_name.clone()),
        site_description: metadata.and_then(|m| m.site_description.clone()),
        favicon: metadata.and_then(|m| m.favicon.clone()),
        preview_image: metadata.and_then(|m| m.preview_image.clone()),
    })
}

pub async fn create<S, M>(
    State(state): State<AppState<S, M>>,
    Json(payload): Json<WebLinkCreateRequest>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let input = match validate_create(&payload) {
        Ok(input) => input,
        Err(details) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::with_details("Validation failed", details)),
            )
                .into_response();
        }
    };

    match state.storage.web_link_create(input).await {
        Ok(row) => (
            StatusCode::CREATED,
            Json(ApiData::with_message(
                WebLinkItem::from(WebLinkWithImages {
                    link: row,
                    image_count: 0,
                    recent_images: Vec::new(),
                }),
                "Web link created successfully",
            )),
        )
            .into_response(),
        // One active link per URL, enforced by a partial unique index.
        Err(StorageError::Conflict(_)) => (
            StatusCode::CONFLICT,
            Json(ApiError::new("A web link with this URL already exists")),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to create web link: {err}");
            internal_error()
        }
    }
}

pub async fn visit<S, M>(
    State(state): State<AppState<S, M>>,
    Query(query): Query<VisitQuery>,
) -> impl IntoResponse
where
    S: GalleryStorage,
    M: MediaStorage,
{
    let (Some(id), Some("visit")) = (query.id.as_deref(), query.action.as_deref()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Invalid parameters")),
        )
            .into_response();
    };
    let Ok(id) = id.parse::<Uuid>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Invalid web link ID format")),
        )
            .into_response();
    };

    match state.storage.web_link_visit(id).await {
        Ok(Some(row)) => {
            (StatusCode::OK, Json(ApiData::new(VisitBody::from(row)))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Web link not found")),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to record visit for web link {id}: {err}");
            internal_error()
        }
    }
}
