//! In-memory [`GalleryStorage`] used by the test suites.
//!
//! Mirrors the database-enforced constraints (case-insensitive album names,
//! one active link per URL, referential checks) so handler tests observe the
//! same failures the Postgres backend produces.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::query::{
    ImageListSelection, WebLinkListSelection, compare_images, compare_web_links,
};

use super::{
    CategoryCount, FavoriteRow, GalleryStorage, GroupCreate, GroupRow, GroupWithCount,
    ImageInsert, ImagePatch, ImageRow, RECENT_IMAGES_PER_LINK, RecentImageRow,
    StatisticsOverview, StorageError, TagCount, VisitRow, WebLinkCreate, WebLinkRow,
    WebLinkStatistics, WebLinkWithImages,
};

#[derive(Debug, Default)]
struct Inner {
    images: HashMap<Uuid, ImageRow>,
    groups: HashMap<Uuid, GroupRow>,
    links: HashMap<Uuid, WebLinkRow>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed image row, bypassing constraint checks.
    pub fn seed_image(&self, image: ImageRow) {
        self.inner
            .write()
            .expect("lock poisoned")
            .images
            .insert(image.id, image);
    }

    pub fn seed_group(&self, group: GroupRow) {
        self.inner
            .write()
            .expect("lock poisoned")
            .groups
            .insert(group.id, group);
    }

    pub fn seed_web_link(&self, link: WebLinkRow) {
        self.inner
            .write()
            .expect("lock poisoned")
            .links
            .insert(link.id, link);
    }

    pub fn image_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").images.len()
    }
}

impl GalleryStorage for MemoryStorage {
    async fn is_connected(&self) -> bool {
        true
    }

    async fn images_page(
        &self,
        selection: &ImageListSelection,
    ) -> Result<(Vec<ImageRow>, u64), StorageError> {
        let inner = self.inner.read().expect("lock poisoned");
        let mut rows: Vec<ImageRow> = inner
            .images
            .values()
            .filter(|i| selection.filter.matches(i))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare_images(a, b, selection.sort));
        let total = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(selection.offset() as usize)
            .take(selection.limit as usize)
            .collect();
        Ok((rows, total))
    }

    async fn image_get(&self, id: Uuid) -> Result<Option<ImageRow>, StorageError> {
        let inner = self.inner.read().expect("lock poisoned");
        Ok(inner.images.get(&id).cloned())
    }

    async fn image_insert(&self, input: ImageInsert) -> Result<ImageRow, StorageError> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner
            .images
            .values()
            .any(|i| i.storage_id == input.storage_id)
        {
            return Err(StorageError::Conflict("images_storage_id_key".to_owned()));
        }
        if let Some(group_id) = input.group_id {
            if !inner.groups.contains_key(&group_id) {
                return Err(StorageError::MissingReference(
                    "images_group_id_fkey".to_owned(),
                ));
            }
        }
        if let Some(link_id) = input.web_link_id {
            if !inner.links.contains_key(&link_id) {
                return Err(StorageError::MissingReference(
                    "images_web_link_id_fkey".to_owned(),
                ));
            }
        }
        let now = Utc::now();
        let row = ImageRow {
            id: Uuid::new_v4(),
            url: input.url,
            storage_id: input.storage_id,
            caption: input.caption,
            group_id: input.group_id,
            web_link_id: input.web_link_id,
            taken_at: input.taken_at,
            is_favorite: false,
            width: input.width,
            height: input.height,
            format: input.format,
            size_bytes: input.size_bytes,
            original_filename: input.original_filename,
            tags: input.tags,
            created_at: now,
            updated_at: now,
        };
        inner.images.insert(row.id, row.clone());
        Ok(row)
    }

    async fn image_update(
        &self,
        id: Uuid,
        patch: ImagePatch,
    ) -> Result<Option<ImageRow>, StorageError> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if let Some(Some(group_id)) = patch.group {
            if !inner.groups.contains_key(&group_id) {
                return Err(StorageError::MissingReference(
                    "images_group_id_fkey".to_owned(),
                ));
            }
        }
        let Some(image) = inner.images.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(image, Utc::now());
        Ok(Some(image.clone()))
    }

    async fn image_toggle_favorite(&self, id: Uuid) -> Result<Option<FavoriteRow>, StorageError> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let Some(image) = inner.images.get_mut(&id) else {
            return Ok(None);
        };
        image.is_favorite = !image.is_favorite;
        image.updated_at = Utc::now();
        Ok(Some(FavoriteRow {
            id: image.id,
            is_favorite: image.is_favorite,
            updated_at: image.updated_at,
        }))
    }

    async fn image_delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().expect("lock poisoned");
        Ok(inner.images.remove(&id).is_some())
    }

    async fn groups_list(&self) -> Result<Vec<GroupWithCount>, StorageError> {
        let inner = self.inner.read().expect("lock poisoned");
        let mut groups: Vec<GroupWithCount> = inner
            .groups
            .values()
            .map(|g| GroupWithCount {
                group: g.clone(),
                image_count: inner
                    .images
                    .values()
                    .filter(|i| i.group_id == Some(g.id))
                    .count() as i64,
            })
            .collect();
        groups.sort_by(|a, b| a.group.name.cmp(&b.group.name));
        Ok(groups)
    }

    async fn group_get(&self, id: Uuid) -> Result<Option<GroupRow>, StorageError> {
        let inner = self.inner.read().expect("lock poisoned");
        Ok(inner.groups.get(&id).cloned())
    }

    async fn group_create(&self, input: GroupCreate) -> Result<GroupRow, StorageError> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let lowered = input.name.to_lowercase();
        if inner
            .groups
            .values()
            .any(|g| g.name.to_lowercase() == lowered)
        {
            return Err(StorageError::Conflict("image_groups_name_unique".to_owned()));
        }
        let now = Utc::now();
        let row = GroupRow {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            date_start: input.date_start,
            date_end: input.date_end,
            created_at: now,
            updated_at: now,
        };
        inner.groups.insert(row.id, row.clone());
        Ok(row)
    }

    async fn group_delete(&self, id: Uuid) -> Result<Option<u64>, StorageError> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner.groups.remove(&id).is_none() {
            return Ok(None);
        }
        let now = Utc::now();
        let mut detached = 0;
        for image in inner.images.values_mut() {
            if image.group_id == Some(id) {
                image.group_id = None;
                image.updated_at = now;
                detached += 1;
            }
        }
        Ok(Some(detached))
    }

    async fn web_links_page(
        &self,
        selection: &WebLinkListSelection,
    ) -> Result<(Vec<WebLinkWithImages>, u64), StorageError> {
        let inner = self.inner.read().expect("lock poisoned");
        let mut rows: Vec<WebLinkRow> = inner
            .links
            .values()
            .filter(|l| selection.filter.matches(l))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare_web_links(a, b, selection.sort));
        let total = rows.len() as u64;
        let links = rows
            .into_iter()
            .skip(selection.offset as usize)
            .take(selection.limit as usize)
            .map(|link| {
                let mut attached: Vec<&ImageRow> = inner
                    .images
                    .values()
                    .filter(|i| i.web_link_id == Some(link.id))
                    .collect();
                attached.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                let image_count = attached.len() as i64;
                let recent_images = attached
                    .into_iter()
                    .take(RECENT_IMAGES_PER_LINK)
                    .map(|i| RecentImageRow {
                        id: i.id,
                        url: i.url.clone(),
                        caption: i.caption.clone(),
                        created_at: i.created_at,
                    })
                    .collect();
                WebLinkWithImages {
                    link,
                    image_count,
                    recent_images,
                }
            })
            .collect();
        Ok((links, total))
    }

    async fn web_link_get(&self, id: Uuid) -> Result<Option<WebLinkRow>, StorageError> {
        let inner = self.inner.read().expect("lock poisoned");
        Ok(inner.links.get(&id).cloned())
    }

    async fn web_link_create(&self, input: WebLinkCreate) -> Result<WebLinkRow, StorageError> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner
            .links
            .values()
            .any(|l| l.is_active && l.url == input.url)
        {
            return Err(StorageError::Conflict(
                "web_links_active_url_unique".to_owned(),
            ));
        }
        let now = Utc::now();
        let row = WebLinkRow {
            id: Uuid::new_v4(),
            title: input.title,
            url: input.url,
            description: input.description,
            tags: input.tags,
            category: input.category,
            is_active: true,
            background_color: input.background_color,
            text_color: input.text_color,
            visit_count: 0,
            last_visited: None,
            site_name: input.site_name,
            site_description: input.site_description,
            favicon: input.favicon,
            preview_image: input.preview_image,
            created_at: now,
            updated_at: now,
        };
        inner.links.insert(row.id, row.clone());
        Ok(row)
    }

    async fn web_link_visit(&self, id: Uuid) -> Result<Option<VisitRow>, StorageError> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let Some(link) = inner.links.get_mut(&id) else {
            return Ok(None);
        };
        let now = Utc::now();
        link.visit_count += 1;
        link.last_visited = Some(now);
        link.updated_at = now;
        Ok(Some(VisitRow {
            id: link.id,
            visit_count: link.visit_count,
            last_visited: link.last_visited,
        }))
    }

    async fn web_link_statistics(&self) -> Result<WebLinkStatistics, StorageError> {
        let inner = self.inner.read().expect("lock poisoned");
        let active: Vec<&WebLinkRow> = inner.links.values().filter(|l| l.is_active).collect();

        let mut by_category: HashMap<&str, i64> = HashMap::new();
        let mut by_tag: HashMap<&str, i64> = HashMap::new();
        for link in &active {
            *by_category.entry(link.category.as_str()).or_default() += 1;
            for tag in &link.tags {
                *by_tag.entry(tag.as_str()).or_default() += 1;
            }
        }

        let mut categories: Vec<CategoryCount> = by_category
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_owned(),
                count,
            })
            .collect();
        categories.sort_by(|a, b| a.category.cmp(&b.category));

        let mut popular_tags: Vec<TagCount> = by_tag
            .into_iter()
            .map(|(name, count)| TagCount {
                name: name.to_owned(),
                count,
            })
            .collect();
        popular_tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        popular_tags.truncate(20);

        let total_links = active.len() as i64;
        let total_visits: i64 = active.iter().map(|l| l.visit_count).sum();
        Ok(WebLinkStatistics {
            categories,
            popular_tags,
            overview: StatisticsOverview {
                total_links,
                total_visits,
                avg_visits_per_link: if total_links == 0 {
                    0.0
                } else {
                    total_visits as f64 / total_links as f64
                },
                last_updated: active.iter().map(|l| l.updated_at).max(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ImageListParams, ImageListSelection};

    fn insert(n: u32) -> ImageInsert {
        ImageInsert {
            url: format!("https://media.test/img-{n}.jpg"),
            storage_id: format!("gallery/img-{n}"),
            caption: format!("Image {n}"),
            group_id: None,
            web_link_id: None,
            taken_at: Utc::now(),
            width: None,
            height: None,
            format: None,
            size_bytes: None,
            original_filename: None,
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_storage_id() {
        let storage = MemoryStorage::new();
        storage.image_insert(insert(1)).await.unwrap();
        let err = storage.image_insert(insert(1)).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_insert_rejects_missing_group() {
        let storage = MemoryStorage::new();
        let mut input = insert(1);
        input.group_id = Some(Uuid::new_v4());
        let err = storage.image_insert(input).await.unwrap_err();
        assert!(matches!(err, StorageError::MissingReference(_)));
    }

    #[tokio::test]
    async fn test_group_name_conflict_is_case_insensitive() {
        let storage = MemoryStorage::new();
        let input = GroupCreate {
            name: "Summer".to_owned(),
            description: String::new(),
            date_start: None,
            date_end: None,
        };
        storage.group_create(input.clone()).await.unwrap();
        let mut dup = input;
        dup.name = "SUMMER".to_owned();
        let err = storage.group_create(dup).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_toggle_favorite_round_trips() {
        let storage = MemoryStorage::new();
        let row = storage.image_insert(insert(1)).await.unwrap();
        let on = storage.image_toggle_favorite(row.id).await.unwrap().unwrap();
        assert!(on.is_favorite);
        let off = storage.image_toggle_favorite(row.id).await.unwrap().unwrap();
        assert!(!off.is_favorite);
        assert!(
            storage
                .image_toggle_favorite(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_group_delete_detaches_images() {
        let storage = MemoryStorage::new();
        let group = storage
            .group_create(GroupCreate {
                name: "Trips".to_owned(),
                description: String::new(),
                date_start: None,
                date_end: None,
            })
            .await
            .unwrap();
        let mut input = insert(1);
        input.group_id = Some(group.id);
        let image = storage.image_insert(input).await.unwrap();

        let detached = storage.group_delete(group.id).await.unwrap();
        assert_eq!(detached, Some(1));
        let image = storage.image_get(image.id).await.unwrap().unwrap();
        assert_eq!(image.group_id, None);
        assert_eq!(storage.group_delete(group.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_images_page_windows_and_counts() {
        let storage = MemoryStorage::new();
        for n in 0..5 {
            storage.image_insert(insert(n)).await.unwrap();
        }
        let selection = ImageListSelection::build(ImageListParams {
            limit: Some(2),
            page: Some(3),
            ..ImageListParams::default()
        })
        .unwrap();
        let (rows, total) = storage.images_page(&selection).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(rows.len(), 1);
    }
}
