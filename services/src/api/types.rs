//! Wire types shared by the API endpoints.
//!
//! Every response is wrapped in an envelope: `{"success": true, "data": ...}`
//! on success, `{"success": false, "error": ...}` on failure. Field names are
//! camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{
    FavoriteRow, GroupRow, GroupWithCount, ImageRow, RecentImageRow, VisitRow, WebLinkStatistics,
    WebLinkWithImages,
};
use crate::pagination::{OffsetInfo, PageInfo};
use crate::query::{ImageListParams, WebLinkListParams};

#[derive(Debug, Serialize)]
pub struct ApiData<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiData<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            details: None,
        }
    }

    pub fn with_details(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            success: false,
            error: message.into(),
            details: Some(details),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub format: Option<String>,
    pub size: Option<i64>,
    pub original_filename: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    pub id: Uuid,
    pub url: String,
    pub storage_id: String,
    pub caption: String,
    pub group_id: Option<Uuid>,
    pub web_link_id: Option<Uuid>,
    pub taken_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub metadata: ImageMetadata,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ImageRow> for ImageItem {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            storage_id: row.storage_id,
            caption: row.caption,
            group_id: row.group_id,
            web_link_id: row.web_link_id,
            taken_at: row.taken_at,
            is_favorite: row.is_favorite,
            metadata: ImageMetadata {
                width: row.width,
                height: row.height,
                format: row.format,
                size: row.size_bytes,
                original_filename: row.original_filename,
            },
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DateRangeBody {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRangeBody>,
    pub image_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupItem {
    pub fn from_row(row: GroupRow, image_count: i64) -> Self {
        let date_range = (row.date_start.is_some() || row.date_end.is_some()).then(|| {
            DateRangeBody {
                start: row.date_start,
                end: row.date_end,
            }
        });
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            date_range,
            image_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<GroupWithCount> for GroupItem {
    fn from(row: GroupWithCount) -> Self {
        Self::from_row(row.group, row.image_count)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_images: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl ImagePagination {
    pub fn from_page(info: PageInfo, total_images: u64) -> Self {
        Self {
            current_page: info.current_page,
            total_pages: info.total_pages,
            total_images,
            has_next: info.has_next,
            has_prev: info.has_prev,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesListBody {
    pub images: Vec<ImageItem>,
    pub groups: Vec<GroupItem>,
    pub pagination: ImagePagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteBody {
    pub id: Uuid,
    pub is_favorite: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<FavoriteRow> for FavoriteBody {
    fn from(row: FavoriteRow) -> Self {
        Self {
            id: row.id,
            is_favorite: row.is_favorite,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStateBody {
    pub id: Uuid,
    pub is_favorite: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFrom {
    pub cloudinary: bool,
    pub database: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImageBody {
    pub id: Uuid,
    pub deleted_from: DeletedFrom,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAssignBody {
    pub id: Uuid,
    pub group: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDeleteBody {
    pub id: Uuid,
    pub detached_images: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentImageItem {
    pub id: Uuid,
    pub url: String,
    pub caption: String,
    pub created_at: DateTime<Utc>,
}

impl From<RecentImageRow> for RecentImageItem {
    fn from(row: RecentImageRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            caption: row.caption,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadataBody {
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub favicon: Option<String>,
    pub preview_image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebLinkItem {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub is_active: bool,
    pub background_color: String,
    pub text_color: String,
    pub visit_count: i64,
    pub last_visited: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SiteMetadataBody>,
    pub image_count: i64,
    pub recent_images: Vec<RecentImageItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebLinkWithImages> for WebLinkItem {
    fn from(row: WebLinkWithImages) -> Self {
        let link = row.link;
        let metadata = (link.site_name.is_some()
            || link.site_description.is_some()
            || link.favicon.is_some()
            || link.preview_image.is_some())
        .then(|| SiteMetadataBody {
            site_name: link.site_name.clone(),
            site_description: link.site_description.clone(),
            favicon: link.favicon.clone(),
            preview_image: link.preview_image.clone(),
        });
        Self {
            id: link.id,
            title: link.title,
            url: link.url,
            description: link.description,
            tags: link.tags,
            category: link.category,
            is_active: link.is_active,
            background_color: link.background_color,
            text_color: link.text_color,
            visit_count: link.visit_count,
            last_visited: link.last_visited,
            metadata,
            image_count: row.image_count,
            recent_images: row.recent_images.into_iter().map(Into::into).collect(),
            created_at: link.created_at,
            updated_at: link.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebLinkPagination {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
    pub total_pages: u64,
    pub current_page: u64,
}

impl From<OffsetInfo> for WebLinkPagination {
    fn from(info: OffsetInfo) -> Self {
        Self {
            total: info.total,
            limit: info.limit,
            offset: info.offset,
            has_more: info.has_more,
            total_pages: info.total_pages,
            current_page: info.current_page,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCountBody {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCountBody {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsOverviewBody {
    pub total_links: i64,
    pub total_visits: i64,
    pub avg_visits_per_link: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsBody {
    pub categories: Vec<CategoryCountBody>,
    pub popular_tags: Vec<TagCountBody>,
    pub overview: StatisticsOverviewBody,
}

impl From<WebLinkStatistics> for StatisticsBody {
    fn from(stats: WebLinkStatistics) -> Self {
        Self {
            categories: stats
                .categories
                .into_iter()
                .map(|c| CategoryCountBody {
                    category: c.category,
                    count: c.count,
                })
                .collect(),
            popular_tags: stats
                .popular_tags
                .into_iter()
                .map(|t| TagCountBody {
                    name: t.name,
                    count: t.count,
                })
                .collect(),
            overview: StatisticsOverviewBody {
                total_links: stats.overview.total_links,
                total_visits: stats.overview.total_visits,
                avg_visits_per_link: stats.overview.avg_visits_per_link,
                last_updated: stats.overview.last_updated,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebLinksListBody {
    pub web_links: Vec<WebLinkItem>,
    pub pagination: WebLinkPagination,
    pub statistics: StatisticsBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitBody {
    pub visit_count: i64,
    pub last_visited: Option<DateTime<Utc>>,
}

impl From<VisitRow> for VisitBody {
    fn from(row: VisitRow) -> Self {
        Self {
            visit_count: row.visit_count,
            last_visited: row.last_visited,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailureBody {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBatchBody {
    pub images: Vec<ImageItem>,
    pub count: usize,
    pub failed: Vec<UploadFailureBody>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImagesListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub group: Option<String>,
    pub search: Option<String>,
    pub favorites_only: Option<bool>,
    pub tags: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub web_link_id: Option<String>,
}

impl From<ImagesListQuery> for ImageListParams {
    fn from(query: ImagesListQuery) -> Self {
        ImageListParams {
            page: query.page,
            limit: query.limit,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
            group: query.group,
            search: query.search,
            favorites_only: query.favorites_only,
            tags: query.tags,
            start_date: query.start_date,
            end_date: query.end_date,
            web_link_id: query.web_link_id,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpdateRequest {
    pub caption: Option<String>,
    pub group_id: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupAssignRequest {
    pub group_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeRequest {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupCreateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date_range: Option<DateRangeRequest>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebLinksListQuery {
    pub category: Option<String>,
    pub tags: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub include_inactive: Option<bool>,
}

impl From<WebLinksListQuery> for WebLinkListParams {
    fn from(query: WebLinksListQuery) -> Self {
        WebLinkListParams {
            category: query.category,
            tags: query.tags,
            search: query.search,
            limit: query.limit,
            offset: query.offset,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
            include_inactive: query.include_inactive,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadataRequest {
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub favicon: Option<String>,
    pub preview_image: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebLinkCreateRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub metadata: Option<SiteMetadataRequest>,
}

#[derive(Debug, Deserialize, Default)]
pub struct VisitQuery {
    pub id: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UrlUploadRequest {
    pub image_url: Option<String>,
    pub caption: Option<String>,
    pub group_id: Option<String>,
    pub tags: Option<Vec<String>>,
}
