//! Storage layer: row types, the [`GalleryStorage`] trait, and pool setup.
//!
//! Handlers are generic over [`GalleryStorage`]; [`PgStorage`] backs the real
//! service and [`MemoryStorage`] backs the test suites.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::config::Config;
use crate::query::{ImageListSelection, WebLinkListSelection};

mod memory;
mod pg;

pub use memory::MemoryStorage;
pub use pg::PgStorage;

/// Connect to Postgres and bring the schema up to date.
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(config.database_url())
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database connection pool established");
    Ok(pool)
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    /// A database uniqueness constraint rejected the write.
    #[error("conflicts with existing record ({0})")]
    Conflict(String),
    /// A referenced row does not exist.
    #[error("referenced record does not exist ({0})")]
    MissingReference(String),
    #[error("database error: {0}")]
    Db(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StorageError::Conflict(db.constraint().unwrap_or("unique").to_owned());
            }
            if db.is_foreign_key_violation() {
                return StorageError::MissingReference(
                    db.constraint().unwrap_or("foreign key").to_owned(),
                );
            }
        }
        StorageError::Db(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ImageRow {
    pub id: Uuid,
    pub url: String,
    pub storage_id: String,
    pub caption: String,
    pub group_id: Option<Uuid>,
    pub web_link_id: Option<Uuid>,
    pub taken_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub format: Option<String>,
    pub size_bytes: Option<i64>,
    pub original_filename: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New image record. Tags are expected in canonical form already.
#[derive(Debug, Clone)]
pub struct ImageInsert {
    pub url: String,
    pub storage_id: String,
    pub caption: String,
    pub group_id: Option<Uuid>,
    pub web_link_id: Option<Uuid>,
    pub taken_at: DateTime<Utc>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub format: Option<String>,
    pub size_bytes: Option<i64>,
    pub original_filename: Option<String>,
    pub tags: Vec<String>,
}

/// Partial image update. `None` leaves a field untouched; the nested option
/// on `group` distinguishes "clear the group" from "do not change it".
#[derive(Debug, Clone, Default)]
pub struct ImagePatch {
    pub caption: Option<String>,
    pub group: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
}

impl ImagePatch {
    pub fn is_empty(&self) -> bool {
        self.caption.is_none() && self.group.is_none() && self.tags.is_none()
    }

    /// In-memory counterpart of the conditional UPDATE.
    pub fn apply(&self, image: &mut ImageRow, now: DateTime<Utc>) {
        if let Some(caption) = &self.caption {
            image.caption = caption.clone();
        }
        if let Some(group) = self.group {
            image.group_id = group;
        }
        if let Some(tags) = &self.tags {
            image.tags = tags.clone();
        }
        image.updated_at = now;
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FavoriteRow {
    pub id: Uuid,
    pub is_favorite: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GroupWithCount {
    #[sqlx(flatten)]
    pub group: GroupRow,
    pub image_count: i64,
}

#[derive(Debug, Clone)]
pub struct GroupCreate {
    pub name: String,
    pub description: String,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct WebLinkRow {
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
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub favicon: Option<String>,
    pub preview_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct WebLinkCreate {
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub background_color: String,
    pub text_color: String,
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub favicon: Option<String>,
    pub preview_image: Option<String>,
}

/// Thumbnail slice of an image attached to a web link.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecentImageRow {
    pub id: Uuid,
    pub url: String,
    pub caption: String,
    pub created_at: DateTime<Utc>,
}

/// How many attached thumbnails each listed web link carries.
pub const RECENT_IMAGES_PER_LINK: usize = 3;

#[derive(Debug, Clone)]
pub struct WebLinkWithImages {
    pub link: WebLinkRow,
    pub image_count: i64,
    pub recent_images: Vec<RecentImageRow>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VisitRow {
    pub id: Uuid,
    pub visit_count: i64,
    pub last_visited: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct StatisticsOverview {
    pub total_links: i64,
    pub total_visits: i64,
    pub avg_visits_per_link: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Aggregates over active web links, returned alongside every listing.
#[derive(Debug, Clone, Default)]
pub struct WebLinkStatistics {
    pub categories: Vec<CategoryCount>,
    pub popular_tags: Vec<TagCount>,
    pub overview: StatisticsOverview,
}

pub trait GalleryStorage: Clone + Send + Sync + 'static {
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// One page of images matching the selection, plus the unpaged total.
    fn images_page(
        &self,
        selection: &ImageListSelection,
    ) -> impl Future<Output = Result<(Vec<ImageRow>, u64), StorageError>> + Send;

    fn image_get(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<ImageRow>, StorageError>> + Send;

    fn image_insert(
        &self,
        input: ImageInsert,
    ) -> impl Future<Output = Result<ImageRow, StorageError>> + Send;

    fn image_update(
        &self,
        id: Uuid,
        patch: ImagePatch,
    ) -> impl Future<Output = Result<Option<ImageRow>, StorageError>> + Send;

    /// Flip the favorite flag atomically at the database.
    fn image_toggle_favorite(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<FavoriteRow>, StorageError>> + Send;

    fn image_delete(&self, id: Uuid) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// All albums ordered by name, each with its image count.
    fn groups_list(
        &self,
    ) -> impl Future<Output = Result<Vec<GroupWithCount>, StorageError>> + Send;

    fn group_get(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<GroupRow>, StorageError>> + Send;

    fn group_create(
        &self,
        input: GroupCreate,
    ) -> impl Future<Output = Result<GroupRow, StorageError>> + Send;

    /// Delete an album, detaching its images. Returns how many images were
    /// detached, or `None` when the album does not exist.
    fn group_delete(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<u64>, StorageError>> + Send;

    fn web_links_page(
        &self,
        selection: &WebLinkListSelection,
    ) -> impl Future<Output = Result<(Vec<WebLinkWithImages>, u64), StorageError>> + Send;

    fn web_link_get(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<WebLinkRow>, StorageError>> + Send;

    fn web_link_create(
        &self,
        input: WebLinkCreate,
    ) -> impl Future<Output = Result<WebLinkRow, StorageError>> + Send;

    /// Record one visit atomically at the database.
    fn web_link_visit(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<VisitRow>, StorageError>> + Send;

    fn web_link_statistics(
        &self,
    ) -> impl Future<Output = Result<WebLinkStatistics, StorageError>> + Send;
}
