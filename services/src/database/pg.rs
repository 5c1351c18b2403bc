//! Postgres-backed [`GalleryStorage`].
//!
//! Listing queries are assembled with `QueryBuilder` so the page query and
//! its count query share one filter translation.

use sqlx::postgres::Postgres;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::query::{
    GroupFilter, ImageFilter, ImageListSelection, ImageSort, ImageSortKey, LinkFilter, SortOrder,
    WebLinkFilter, WebLinkListSelection, WebLinkSort, WebLinkSortKey,
};

use super::{
    CategoryCount, FavoriteRow, GalleryStorage, GroupCreate, GroupRow, GroupWithCount,
    ImageInsert, ImagePatch, ImageRow, RECENT_IMAGES_PER_LINK, RecentImageRow, StatisticsOverview,
    StorageError, TagCount, VisitRow, WebLinkCreate, WebLinkRow, WebLinkStatistics,
    WebLinkWithImages,
};

#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE metacharacters so a search term is matched literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_image_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ImageFilter) {
    let mut prefix = " WHERE ";
    let mut sep = |qb: &mut QueryBuilder<'_, Postgres>| {
        qb.push(prefix);
        prefix = " AND ";
    };

    match filter.group {
        GroupFilter::Any => {}
        GroupFilter::Ungrouped => {
            sep(qb);
            qb.push("group_id IS NULL");
        }
        GroupFilter::Group(id) => {
            sep(qb);
            qb.push("group_id = ").push_bind(id);
        }
    }
    match filter.web_link {
        LinkFilter::Any => {}
        LinkFilter::Unlinked => {
            sep(qb);
            qb.push("web_link_id IS NULL");
        }
        LinkFilter::Link(id) => {
            sep(qb);
            qb.push("web_link_id = ").push_bind(id);
        }
    }
    if filter.favorites_only {
        sep(qb);
        qb.push("is_favorite");
    }
    if !filter.tags.is_empty() {
        sep(qb);
        qb.push("tags && ").push_bind(filter.tags.clone());
    }
    if let Some(after) = filter.taken_after {
        sep(qb);
        qb.push("taken_at >= ").push_bind(after);
    }
    if let Some(before) = filter.taken_before {
        sep(qb);
        qb.push("taken_at <= ").push_bind(before);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        sep(qb);
        qb.push("(caption ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS t WHERE t ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

fn order_dir(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

fn image_order_sql(sort: ImageSort) -> String {
    let dir = order_dir(sort.order);
    let tie = order_dir(sort.created_at_order());
    match sort.key {
        ImageSortKey::TakenAt => format!(" ORDER BY taken_at {dir}, created_at {tie}"),
        ImageSortKey::Caption => format!(" ORDER BY caption {dir}, created_at {tie}"),
        ImageSortKey::Favorite => format!(" ORDER BY is_favorite {dir}, created_at {tie}"),
        // NULLS LAST keeps ungrouped images at the tail in both directions,
        // matching the in-memory comparator.
        ImageSortKey::Group => format!(" ORDER BY group_id {dir} NULLS LAST, created_at {tie}"),
        ImageSortKey::CreatedAt => format!(" ORDER BY created_at {dir}"),
    }
}

fn push_web_link_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &WebLinkFilter) {
    let mut prefix = " WHERE ";
    let mut sep = |qb: &mut QueryBuilder<'_, Postgres>| {
        qb.push(prefix);
        prefix = " AND ";
    };

    if !filter.include_inactive {
        sep(qb);
        qb.push("is_active");
    }
    if let Some(category) = &filter.category {
        sep(qb);
        qb.push("category = ").push_bind(category.clone());
    }
    if !filter.tags.is_empty() {
        sep(qb);
        qb.push("tags && ").push_bind(filter.tags.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        sep(qb);
        qb.push("(title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS t WHERE t ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

fn web_link_order_sql(sort: WebLinkSort) -> String {
    let dir = order_dir(sort.order);
    match sort.key {
        WebLinkSortKey::CreatedAt => format!(" ORDER BY created_at {dir}"),
        WebLinkSortKey::VisitCount => format!(" ORDER BY visit_count {dir}, created_at DESC"),
        // NULLS LAST keeps never-visited links at the tail in both directions.
        WebLinkSortKey::LastVisited => {
            format!(" ORDER BY last_visited {dir} NULLS LAST, created_at DESC")
        }
        WebLinkSortKey::Title => format!(" ORDER BY title {dir}, created_at DESC"),
    }
}

#[derive(sqlx::FromRow)]
struct WebLinkCountRow {
    #[sqlx(flatten)]
    link: WebLinkRow,
    image_count: i64,
}

#[derive(sqlx::FromRow)]
struct LinkedRecentImageRow {
    web_link_id: Option<Uuid>,
    #[sqlx(flatten)]
    image: RecentImageRow,
}

#[derive(sqlx::FromRow)]
struct OverviewRow {
    total_links: i64,
    total_visits: i64,
    avg_visits_per_link: f64,
    last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

impl GalleryStorage for PgStorage {
    async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn images_page(
        &self,
        selection: &ImageListSelection,
    ) -> Result<(Vec<ImageRow>, u64), StorageError> {
        let mut qb = QueryBuilder::new("SELECT * FROM images");
        push_image_filter(&mut qb, &selection.filter);
        qb.push(image_order_sql(selection.sort));
        qb.push(" LIMIT ")
            .push_bind(selection.limit as i64)
            .push(" OFFSET ")
            .push_bind(selection.offset() as i64);
        let rows = qb
            .build_query_as::<ImageRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_qb = QueryBuilder::new("SELECT count(*) FROM images");
        push_image_filter(&mut count_qb, &selection.filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total as u64))
    }

    async fn image_get(&self, id: Uuid) -> Result<Option<ImageRow>, StorageError> {
        let row = sqlx::query_as::<_, ImageRow>("SELECT * FROM images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn image_insert(&self, input: ImageInsert) -> Result<ImageRow, StorageError> {
        let row = sqlx::query_as::<_, ImageRow>(
            "INSERT INTO images \
               (url, storage_id, caption, group_id, web_link_id, taken_at, \
                width, height, format, size_bytes, original_filename, tags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING *",
        )
        .bind(input.url)
        .bind(input.storage_id)
        .bind(input.caption)
        .bind(input.group_id)
        .bind(input.web_link_id)
        .bind(input.taken_at)
        .bind(input.width)
        .bind(input.height)
        .bind(input.format)
        .bind(input.size_bytes)
        .bind(input.original_filename)
        .bind(input.tags)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn image_update(
        &self,
        id: Uuid,
        patch: ImagePatch,
    ) -> Result<Option<ImageRow>, StorageError> {
        let row = sqlx::query_as::<_, ImageRow>(
            "UPDATE images SET \
               caption = COALESCE($2, caption), \
               group_id = CASE WHEN $3 THEN $4 ELSE group_id END, \
               tags = COALESCE($5, tags), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING *",
        )
        .bind(id)
        .bind(patch.caption)
        .bind(patch.group.is_some())
        .bind(patch.group.flatten())
        .bind(patch.tags)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn image_toggle_favorite(&self, id: Uuid) -> Result<Option<FavoriteRow>, StorageError> {
        let row = sqlx::query_as::<_, FavoriteRow>(
            "UPDATE images SET is_favorite = NOT is_favorite, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, is_favorite, updated_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn image_delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn groups_list(&self) -> Result<Vec<GroupWithCount>, StorageError> {
        let rows = sqlx::query_as::<_, GroupWithCount>(
            "SELECT g.*, count(i.id) AS image_count \
             FROM image_groups g \
             LEFT JOIN images i ON i.group_id = g.id \
             GROUP BY g.id \
             ORDER BY g.name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn group_get(&self, id: Uuid) -> Result<Option<GroupRow>, StorageError> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT * FROM image_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn group_create(&self, input: GroupCreate) -> Result<GroupRow, StorageError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "INSERT INTO image_groups (name, description, date_start, date_end) \
             VALUES ($1, $2, $3, $4) \
             RETURNING *",
        )
        .bind(input.name)
        .bind(input.description)
        .bind(input.date_start)
        .bind(input.date_end)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn group_delete(&self, id: Uuid) -> Result<Option<u64>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let detached = sqlx::query(
            "UPDATE images SET group_id = NULL, updated_at = now() WHERE group_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let deleted = sqlx::query("DELETE FROM image_groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok((deleted > 0).then_some(detached))
    }

    async fn web_links_page(
        &self,
        selection: &WebLinkListSelection,
    ) -> Result<(Vec<WebLinkWithImages>, u64), StorageError> {
        let mut qb = QueryBuilder::new(
            "SELECT w.*, \
               (SELECT count(*) FROM images i WHERE i.web_link_id = w.id) AS image_count \
             FROM web_links w",
        );
        push_web_link_filter(&mut qb, &selection.filter);
        qb.push(web_link_order_sql(selection.sort));
        qb.push(" LIMIT ")
            .push_bind(selection.limit as i64)
            .push(" OFFSET ")
            .push_bind(selection.offset as i64);
        let rows = qb
            .build_query_as::<WebLinkCountRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_qb = QueryBuilder::new("SELECT count(*) FROM web_links w");
        push_web_link_filter(&mut count_qb, &selection.filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        // The lateral join bounds the read to the newest few images per link
        // instead of fetching every attached image.
        let ids: Vec<Uuid> = rows.iter().map(|r| r.link.id).collect();
        let recent = sqlx::query_as::<_, LinkedRecentImageRow>(
            "SELECT r.web_link_id, r.id, r.url, r.caption, r.created_at \
             FROM unnest($1::uuid[]) AS link_id \
             JOIN LATERAL ( \
               SELECT web_link_id, id, url, caption, created_at \
               FROM images \
               WHERE web_link_id = link_id \
               ORDER BY created_at DESC \
               LIMIT $2 \
             ) AS r ON true",
        )
        .bind(&ids)
        .bind(RECENT_IMAGES_PER_LINK as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut links: Vec<WebLinkWithImages> = rows
            .into_iter()
            .map(|r| WebLinkWithImages {
                link: r.link,
                image_count: r.image_count,
                recent_images: Vec::new(),
            })
            .collect();
        for row in recent {
            let Some(link_id) = row.web_link_id else {
                continue;
            };
            if let Some(entry) = links.iter_mut().find(|l| l.link.id == link_id) {
                entry.recent_images.push(row.image);
            }
        }

        Ok((links, total as u64))
    }

    async fn web_link_get(&self, id: Uuid) -> Result<Option<WebLinkRow>, StorageError> {
        let row = sqlx::query_as::<_, WebLinkRow>("SELECT * FROM web_links WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn web_link_create(&self, input: WebLinkCreate) -> Result<WebLinkRow, StorageError> {
        let row = sqlx::query_as::<_, WebLinkRow>(
            "INSERT INTO web_links \
               (title, url, description, tags, category, background_color, text_color, \
                site_name, site_description, favicon, preview_image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING *",
        )
        .bind(input.title)
        .bind(input.url)
        .bind(input.description)
        .bind(input.tags)
        .bind(input.category)
        .bind(input.background_color)
        .bind(input.text_color)
        .bind(input.site_name)
        .bind(input.site_description)
        .bind(input.favicon)
        .bind(input.preview_image)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn web_link_visit(&self, id: Uuid) -> Result<Option<VisitRow>, StorageError> {
        let row = sqlx::query_as::<_, VisitRow>(
            "UPDATE web_links SET \
               visit_count = visit_count + 1, \
               last_visited = now(), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING id, visit_count, last_visited",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn web_link_statistics(&self) -> Result<WebLinkStatistics, StorageError> {
        let categories = sqlx::query_as::<_, CategoryCount>(
            "SELECT category, count(*) AS count \
             FROM web_links WHERE is_active \
             GROUP BY category ORDER BY category ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let popular_tags = sqlx::query_as::<_, TagCount>(
            "SELECT t AS name, count(*) AS count \
             FROM web_links, unnest(tags) AS t \
             WHERE is_active \
             GROUP BY t ORDER BY count DESC, t ASC \
             LIMIT 20",
        )
        .fetch_all(&self.pool)
        .await?;

        let overview = sqlx::query_as::<_, OverviewRow>(
            "SELECT count(*) AS total_links, \
               COALESCE(sum(visit_count), 0)::bigint AS total_visits, \
               COALESCE(avg(visit_count), 0)::float8 AS avg_visits_per_link, \
               max(updated_at) AS last_updated \
             FROM web_links WHERE is_active",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(WebLinkStatistics {
            categories,
            popular_tags,
            overview: StatisticsOverview {
                total_links: overview.total_links,
                total_visits: overview.total_visits,
                avg_visits_per_link: overview.avg_visits_per_link,
                last_updated: overview.last_updated,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_escapes_metacharacters() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }

    #[test]
    fn test_image_order_sql_tie_break_direction() {
        let date_asc = ImageSort::from_params(Some("date"), Some("asc"));
        assert_eq!(
            image_order_sql(date_asc),
            " ORDER BY taken_at ASC, created_at ASC"
        );
        let name_asc = ImageSort::from_params(Some("name"), Some("asc"));
        assert_eq!(
            image_order_sql(name_asc),
            " ORDER BY caption ASC, created_at DESC"
        );
    }

    #[test]
    fn test_order_sql_nullable_keys_sort_nulls_last() {
        let group_asc = ImageSort::from_params(Some("group"), Some("asc"));
        assert_eq!(
            image_order_sql(group_asc),
            " ORDER BY group_id ASC NULLS LAST, created_at DESC"
        );
        let visited_asc = WebLinkSort {
            key: WebLinkSortKey::LastVisited,
            order: SortOrder::Asc,
        };
        assert_eq!(
            web_link_order_sql(visited_asc),
            " ORDER BY last_visited ASC NULLS LAST, created_at DESC"
        );
    }
}
