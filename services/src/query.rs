//! Typed listing selections built from raw query parameters.
//!
//! The handlers translate transport-level parameters into the selection types
//! here; both storage backends interpret the same selection, so filter and
//! sort semantics live in one place.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::{ImageRow, WebLinkRow};

pub const MIN_PAGE_LIMIT: u64 = 1;
pub const MAX_PAGE_LIMIT: u64 = 100;
pub const DEFAULT_IMAGE_PAGE_LIMIT: u64 = 12;
pub const DEFAULT_WEB_LINK_PAGE_LIMIT: u64 = 50;

/// Largest row offset a listing may start at. Postgres takes the offset as a
/// signed 64-bit value, so anything past this cannot be served anyway.
pub const MAX_LISTING_OFFSET: u64 = i64::MAX as u64;

/// Canonical tag form: trimmed, lowercased, empties dropped, first
/// occurrence wins on duplicates.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Parse a comma separated tag parameter into canonical tags.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupFilter {
    #[default]
    Any,
    Ungrouped,
    Group(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkFilter {
    #[default]
    Any,
    Unlinked,
    Link(Uuid),
}

#[derive(Debug, Clone, Default)]
pub struct ImageFilter {
    pub group: GroupFilter,
    pub web_link: LinkFilter,
    pub search: Option<String>,
    pub favorites_only: bool,
    pub tags: Vec<String>,
    pub taken_after: Option<DateTime<Utc>>,
    pub taken_before: Option<DateTime<Utc>>,
}

impl ImageFilter {
    /// In-memory counterpart of the SQL WHERE clause.
    pub fn matches(&self, image: &ImageRow) -> bool {
        match self.group {
            GroupFilter::Any => {}
            GroupFilter::Ungrouped => {
                if image.group_id.is_some() {
                    return false;
                }
            }
            GroupFilter::Group(id) => {
                if image.group_id != Some(id) {
                    return false;
                }
            }
        }
        match self.web_link {
            LinkFilter::Any => {}
            LinkFilter::Unlinked => {
                if image.web_link_id.is_some() {
                    return false;
                }
            }
            LinkFilter::Link(id) => {
                if image.web_link_id != Some(id) {
                    return false;
                }
            }
        }
        if self.favorites_only && !image.is_favorite {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| image.tags.contains(t)) {
            return false;
        }
        if let Some(after) = self.taken_after {
            if image.taken_at < after {
                return false;
            }
        }
        if let Some(before) = self.taken_before {
            if image.taken_at > before {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_caption = image.caption.to_lowercase().contains(&needle);
            let in_tags = image.tags.iter().any(|t| t.contains(&needle));
            if !in_caption && !in_tags {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSortKey {
    TakenAt,
    Caption,
    Favorite,
    Group,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSort {
    pub key: ImageSortKey,
    pub order: SortOrder,
}

impl ImageSort {
    /// Unknown or absent sort keys fall back to newest-first insertion order.
    pub fn from_params(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        let order = SortOrder::from_param(sort_order);
        let key = match sort_by {
            Some("date") => ImageSortKey::TakenAt,
            Some("name") => ImageSortKey::Caption,
            Some("favorites") => ImageSortKey::Favorite,
            Some("group") => ImageSortKey::Group,
            _ => ImageSortKey::CreatedAt,
        };
        ImageSort { key, order }
    }

    /// Direction of the `created_at` tie-break. The date sort keeps its own
    /// direction for the tie-break; every other key breaks ties newest-first.
    pub fn created_at_order(&self) -> SortOrder {
        match self.key {
            ImageSortKey::TakenAt | ImageSortKey::CreatedAt => self.order,
            _ => SortOrder::Desc,
        }
    }
}

impl Default for ImageSort {
    fn default() -> Self {
        ImageSort {
            key: ImageSortKey::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

/// Absent values sort after present ones regardless of direction, matching
/// NULLS LAST at the database.
fn cmp_nulls_last<T: Ord>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => order.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Total ordering an image listing is returned in.
pub fn compare_images(a: &ImageRow, b: &ImageRow, sort: ImageSort) -> Ordering {
    let primary = match sort.key {
        ImageSortKey::TakenAt => sort.order.apply(a.taken_at.cmp(&b.taken_at)),
        ImageSortKey::Caption => sort.order.apply(a.caption.cmp(&b.caption)),
        ImageSortKey::Favorite => sort.order.apply(a.is_favorite.cmp(&b.is_favorite)),
        ImageSortKey::Group => cmp_nulls_last(a.group_id, b.group_id, sort.order),
        ImageSortKey::CreatedAt => sort.order.apply(a.created_at.cmp(&b.created_at)),
    };
    primary.then_with(|| {
        sort.created_at_order()
            .apply(a.created_at.cmp(&b.created_at))
    })
}

/// Raw image listing parameters as they arrive from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct ImageListParams {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("page is out of range")]
    InvalidPage,
    #[error("limit must be between {MIN_PAGE_LIMIT} and {MAX_PAGE_LIMIT}")]
    InvalidLimit,
    #[error("offset is out of range")]
    InvalidOffset,
    #[error("{0} is not a valid date")]
    InvalidDate(&'static str),
    #[error("unknown category")]
    InvalidCategory,
    #[error("unknown sort key")]
    InvalidSortKey,
}

#[derive(Debug, Clone, Default)]
pub struct ImageListSelection {
    pub filter: ImageFilter,
    pub sort: ImageSort,
    pub page: u64,
    pub limit: u64,
}

impl ImageListSelection {
    pub fn build(params: ImageListParams) -> Result<Self, SelectionError> {
        let page = params.page.unwrap_or(1);
        if page == 0 {
            return Err(SelectionError::InvalidPage);
        }
        let limit = params.limit.unwrap_or(DEFAULT_IMAGE_PAGE_LIMIT);
        if !(MIN_PAGE_LIMIT..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(SelectionError::InvalidLimit);
        }
        // The page number must place the window at a representable offset.
        match (page - 1).checked_mul(limit) {
            Some(offset) if offset <= MAX_LISTING_OFFSET => {}
            _ => return Err(SelectionError::InvalidPage),
        }

        // Unknown group / web link ids are ignored rather than rejected so a
        // stale bookmark of the gallery UI still loads.
        let group = match params.group.as_deref() {
            None | Some("all") => GroupFilter::Any,
            Some("ungrouped") => GroupFilter::Ungrouped,
            Some(raw) => match raw.parse::<Uuid>() {
                Ok(id) => GroupFilter::Group(id),
                Err(_) => GroupFilter::Any,
            },
        };
        let web_link = match params.web_link_id.as_deref() {
            None => LinkFilter::Any,
            Some("null") => LinkFilter::Unlinked,
            Some(raw) => match raw.parse::<Uuid>() {
                Ok(id) => LinkFilter::Link(id),
                Err(_) => LinkFilter::Any,
            },
        };

        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        let tags = params
            .tags
            .as_deref()
            .map(parse_tag_list)
            .unwrap_or_default();

        let taken_after = params
            .start_date
            .as_deref()
            .map(|raw| parse_date_bound(raw, false))
            .transpose()
            .map_err(|_| SelectionError::InvalidDate("startDate"))?;
        let taken_before = params
            .end_date
            .as_deref()
            .map(|raw| parse_date_bound(raw, true))
            .transpose()
            .map_err(|_| SelectionError::InvalidDate("endDate"))?;

        Ok(ImageListSelection {
            filter: ImageFilter {
                group,
                web_link,
                search,
                favorites_only: params.favorites_only.unwrap_or(false),
                tags,
                taken_after,
                taken_before,
            },
            sort: ImageSort::from_params(params.sort_by.as_deref(), params.sort_order.as_deref()),
            page,
            limit,
        })
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates. A bare date used
/// as an upper bound covers the whole day.
fn parse_date_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ()> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date: NaiveDate = raw.parse().map_err(|_| ())?;
    let time = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc()).ok_or(())
}

pub const WEB_LINK_CATEGORIES: [&str; 5] = ["memories", "gifts", "letters", "moments", "other"];

pub fn is_known_category(raw: &str) -> bool {
    WEB_LINK_CATEGORIES.contains(&raw)
}

#[derive(Debug, Clone, Default)]
pub struct WebLinkFilter {
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl WebLinkFilter {
    pub fn matches(&self, link: &WebLinkRow) -> bool {
        if !self.include_inactive && !link.is_active {
            return false;
        }
        if let Some(category) = &self.category {
            if &link.category != category {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| link.tags.contains(t)) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = link.title.to_lowercase().contains(&needle)
                || link.description.to_lowercase().contains(&needle)
                || link.tags.iter().any(|t| t.contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebLinkSortKey {
    CreatedAt,
    VisitCount,
    LastVisited,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebLinkSort {
    pub key: WebLinkSortKey,
    pub order: SortOrder,
}

impl Default for WebLinkSort {
    fn default() -> Self {
        WebLinkSort {
            key: WebLinkSortKey::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

pub fn compare_web_links(a: &WebLinkRow, b: &WebLinkRow, sort: WebLinkSort) -> Ordering {
    let primary = match sort.key {
        WebLinkSortKey::CreatedAt => sort.order.apply(a.created_at.cmp(&b.created_at)),
        WebLinkSortKey::VisitCount => sort.order.apply(a.visit_count.cmp(&b.visit_count)),
        // Never-visited links sort last in both directions.
        WebLinkSortKey::LastVisited => cmp_nulls_last(a.last_visited, b.last_visited, sort.order),
        WebLinkSortKey::Title => sort.order.apply(a.title.cmp(&b.title)),
    };
    primary.then_with(|| b.created_at.cmp(&a.created_at))
}

/// Raw web-link listing parameters as they arrive from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct WebLinkListParams {
    pub category: Option<String>,
    pub tags: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct WebLinkListSelection {
    pub filter: WebLinkFilter,
    pub sort: WebLinkSort,
    pub limit: u64,
    pub offset: u64,
}

impl WebLinkListSelection {
    pub fn build(params: WebLinkListParams) -> Result<Self, SelectionError> {
        let limit = params.limit.unwrap_or(DEFAULT_WEB_LINK_PAGE_LIMIT);
        if !(MIN_PAGE_LIMIT..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(SelectionError::InvalidLimit);
        }
        let offset = params.offset.unwrap_or(0);
        if offset > MAX_LISTING_OFFSET {
            return Err(SelectionError::InvalidOffset);
        }

        let category = match params.category.as_deref() {
            None | Some("all") => None,
            Some(raw) if is_known_category(raw) => Some(raw.to_owned()),
            Some(_) => return Err(SelectionError::InvalidCategory),
        };

        let key = match params.sort_by.as_deref() {
            None | Some("createdAt") => WebLinkSortKey::CreatedAt,
            Some("visitCount") => WebLinkSortKey::VisitCount,
            Some("lastVisited") => WebLinkSortKey::LastVisited,
            Some("title") => WebLinkSortKey::Title,
            Some(_) => return Err(SelectionError::InvalidSortKey),
        };

        Ok(WebLinkListSelection {
            filter: WebLinkFilter {
                category,
                tags: params
                    .tags
                    .as_deref()
                    .map(parse_tag_list)
                    .unwrap_or_default(),
                search: params
                    .search
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned),
                include_inactive: params.include_inactive.unwrap_or(false),
            },
            sort: WebLinkSort {
                key,
                order: SortOrder::from_param(params.sort_order.as_deref()),
            },
            limit,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn image(n: u32) -> ImageRow {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(n as i64);
        ImageRow {
            id: Uuid::new_v4(),
            url: format!("https://media.test/img-{n}.jpg"),
            storage_id: format!("gallery/img-{n}"),
            caption: format!("Image {n}"),
            group_id: None,
            web_link_id: None,
            taken_at: at,
            is_favorite: false,
            width: None,
            height: None,
            format: None,
            size_bytes: None,
            original_filename: None,
            tags: Vec::new(),
            created_at: at,
            updated_at: at,
        }
    }

    fn web_link(n: u32) -> WebLinkRow {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
            + chrono::Duration::minutes(n as i64);
        WebLinkRow {
            id: Uuid::new_v4(),
            title: format!("Link {n}"),
            url: format!("https://example.com/link-{n}"),
            description: String::new(),
            tags: Vec::new(),
            category: "memories".to_owned(),
            is_active: true,
            background_color: "#ec4899".to_owned(),
            text_color: "#ffffff".to_owned(),
            visit_count: 0,
            last_visited: None,
            site_name: None,
            site_description: None,
            favicon: None,
            preview_image: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_normalize_tags_dedupes_case_insensitively() {
        let tags = normalize_tags(["Sunset", "  beach ", "sunset", "", "BEACH"]);
        assert_eq!(tags, vec!["sunset", "beach"]);
    }

    #[test]
    fn test_parse_tag_list_splits_on_commas() {
        assert_eq!(parse_tag_list("A, b ,,a"), vec!["a", "b"]);
    }

    #[test]
    fn test_filter_ungrouped() {
        let mut grouped = image(1);
        grouped.group_id = Some(Uuid::new_v4());
        let filter = ImageFilter {
            group: GroupFilter::Ungrouped,
            ..ImageFilter::default()
        };
        assert!(filter.matches(&image(2)));
        assert!(!filter.matches(&grouped));
    }

    #[test]
    fn test_filter_search_hits_caption_and_tags() {
        let mut tagged = image(1);
        tagged.caption = "At the lake".to_owned();
        tagged.tags = vec!["holiday".to_owned()];
        let by_caption = ImageFilter {
            search: Some("LAKE".to_owned()),
            ..ImageFilter::default()
        };
        let by_tag = ImageFilter {
            search: Some("Holi".to_owned()),
            ..ImageFilter::default()
        };
        let miss = ImageFilter {
            search: Some("mountain".to_owned()),
            ..ImageFilter::default()
        };
        assert!(by_caption.matches(&tagged));
        assert!(by_tag.matches(&tagged));
        assert!(!miss.matches(&tagged));
    }

    #[test]
    fn test_filter_tags_are_or_combined() {
        let mut a = image(1);
        a.tags = vec!["beach".to_owned()];
        let mut b = image(2);
        b.tags = vec!["city".to_owned()];
        let filter = ImageFilter {
            tags: vec!["beach".to_owned(), "forest".to_owned()],
            ..ImageFilter::default()
        };
        assert!(filter.matches(&a));
        assert!(!filter.matches(&b));
    }

    #[test]
    fn test_filter_taken_range_is_inclusive() {
        let img = image(0);
        let filter = ImageFilter {
            taken_after: Some(img.taken_at),
            taken_before: Some(img.taken_at),
            ..ImageFilter::default()
        };
        assert!(filter.matches(&img));
    }

    #[test]
    fn test_sort_defaults_to_newest_first() {
        let sort = ImageSort::from_params(None, None);
        assert_eq!(sort.key, ImageSortKey::CreatedAt);
        assert_eq!(sort.order, SortOrder::Desc);
        let sort = ImageSort::from_params(Some("bogus"), Some("sideways"));
        assert_eq!(sort.key, ImageSortKey::CreatedAt);
        assert_eq!(sort.order, SortOrder::Desc);
    }

    #[test]
    fn test_compare_images_date_keeps_direction_for_tie_break() {
        let sort = ImageSort::from_params(Some("date"), Some("asc"));
        let older = image(1);
        let newer = image(2);
        assert_eq!(compare_images(&older, &newer, sort), Ordering::Less);
        // Same taken_at, different created_at: ascending tie-break.
        let mut a = image(3);
        let mut b = image(4);
        b.taken_at = a.taken_at;
        a.created_at = b.created_at + chrono::Duration::minutes(1);
        assert_eq!(compare_images(&a, &b, sort), Ordering::Greater);
    }

    #[test]
    fn test_compare_images_name_breaks_ties_newest_first() {
        let sort = ImageSort::from_params(Some("name"), Some("asc"));
        let mut a = image(1);
        let mut b = image(2);
        a.caption = "same".to_owned();
        b.caption = "same".to_owned();
        // b is newer, so it sorts first on the tie-break.
        assert_eq!(compare_images(&a, &b, sort), Ordering::Greater);
    }

    #[test]
    fn test_image_selection_defaults() {
        let selection = ImageListSelection::build(ImageListParams::default()).unwrap();
        assert_eq!(selection.page, 1);
        assert_eq!(selection.limit, DEFAULT_IMAGE_PAGE_LIMIT);
        assert_eq!(selection.offset(), 0);
        assert_eq!(selection.filter.group, GroupFilter::Any);
    }

    #[test]
    fn test_image_selection_rejects_bad_window() {
        let zero_page = ImageListParams {
            page: Some(0),
            ..ImageListParams::default()
        };
        assert_eq!(
            ImageListSelection::build(zero_page).unwrap_err(),
            SelectionError::InvalidPage
        );
        let oversized = ImageListParams {
            limit: Some(101),
            ..ImageListParams::default()
        };
        assert_eq!(
            ImageListSelection::build(oversized).unwrap_err(),
            SelectionError::InvalidLimit
        );
    }

    #[test]
    fn test_image_selection_rejects_page_past_representable_offset() {
        let huge = ImageListParams {
            page: Some(u64::MAX),
            limit: Some(100),
            ..ImageListParams::default()
        };
        assert_eq!(
            ImageListSelection::build(huge).unwrap_err(),
            SelectionError::InvalidPage
        );
        // The last representable window still builds.
        let edge = ImageListParams {
            page: Some(MAX_LISTING_OFFSET + 1),
            limit: Some(1),
            ..ImageListParams::default()
        };
        let selection = ImageListSelection::build(edge).unwrap();
        assert_eq!(selection.offset(), MAX_LISTING_OFFSET);
    }

    #[test]
    fn test_web_link_selection_rejects_offset_past_representable_range() {
        let huge = WebLinkListParams {
            offset: Some(u64::MAX),
            ..WebLinkListParams::default()
        };
        assert_eq!(
            WebLinkListSelection::build(huge).unwrap_err(),
            SelectionError::InvalidOffset
        );
        let edge = WebLinkListParams {
            offset: Some(MAX_LISTING_OFFSET),
            ..WebLinkListParams::default()
        };
        assert_eq!(
            WebLinkListSelection::build(edge).unwrap().offset,
            MAX_LISTING_OFFSET
        );
    }

    #[test]
    fn test_compare_images_ungrouped_sort_last_in_both_directions() {
        let sort_asc = ImageSort::from_params(Some("group"), Some("asc"));
        let sort_desc = ImageSort::from_params(Some("group"), Some("desc"));
        let mut grouped = image(1);
        grouped.group_id = Some(Uuid::new_v4());
        let ungrouped = image(2);
        assert_eq!(compare_images(&grouped, &ungrouped, sort_asc), Ordering::Less);
        assert_eq!(compare_images(&grouped, &ungrouped, sort_desc), Ordering::Less);
        assert_eq!(compare_images(&ungrouped, &grouped, sort_asc), Ordering::Greater);
    }

    #[test]
    fn test_compare_web_links_never_visited_sort_last_in_both_directions() {
        let visited = {
            let mut link = web_link(1);
            link.last_visited = Some(link.created_at);
            link
        };
        let never_visited = web_link(2);
        for order in [SortOrder::Asc, SortOrder::Desc] {
            let sort = WebLinkSort {
                key: WebLinkSortKey::LastVisited,
                order,
            };
            assert_eq!(compare_web_links(&visited, &never_visited, sort), Ordering::Less);
            assert_eq!(compare_web_links(&never_visited, &visited, sort), Ordering::Greater);
        }
    }

    #[test]
    fn test_image_selection_ignores_malformed_group_id() {
        let params = ImageListParams {
            group: Some("not-a-uuid".to_owned()),
            ..ImageListParams::default()
        };
        let selection = ImageListSelection::build(params).unwrap();
        assert_eq!(selection.filter.group, GroupFilter::Any);
    }

    #[test]
    fn test_image_selection_web_link_null_means_unlinked() {
        let params = ImageListParams {
            web_link_id: Some("null".to_owned()),
            ..ImageListParams::default()
        };
        let selection = ImageListSelection::build(params).unwrap();
        assert_eq!(selection.filter.web_link, LinkFilter::Unlinked);
    }

    #[test]
    fn test_image_selection_parses_bare_dates() {
        let params = ImageListParams {
            start_date: Some("2026-01-01".to_owned()),
            end_date: Some("2026-01-02".to_owned()),
            ..ImageListParams::default()
        };
        let selection = ImageListSelection::build(params).unwrap();
        let after = selection.filter.taken_after.unwrap();
        let before = selection.filter.taken_before.unwrap();
        assert_eq!(after, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        // The end bound covers the whole day.
        assert!(before > Utc.with_ymd_and_hms(2026, 1, 2, 23, 59, 58).unwrap());
    }

    #[test]
    fn test_image_selection_rejects_malformed_date() {
        let params = ImageListParams {
            start_date: Some("soon".to_owned()),
            ..ImageListParams::default()
        };
        assert_eq!(
            ImageListSelection::build(params).unwrap_err(),
            SelectionError::InvalidDate("startDate")
        );
    }

    #[test]
    fn test_web_link_selection_rejects_unknown_category_and_sort() {
        let bad_category = WebLinkListParams {
            category: Some("misc".to_owned()),
            ..WebLinkListParams::default()
        };
        assert_eq!(
            WebLinkListSelection::build(bad_category).unwrap_err(),
            SelectionError::InvalidCategory
        );
        let bad_sort = WebLinkListParams {
            sort_by: Some("popularity".to_owned()),
            ..WebLinkListParams::default()
        };
        assert_eq!(
            WebLinkListSelection::build(bad_sort).unwrap_err(),
            SelectionError::InvalidSortKey
        );
    }

    #[test]
    fn test_web_link_selection_all_category_means_no_filter() {
        let params = WebLinkListParams {
            category: Some("all".to_owned()),
            ..WebLinkListParams::default()
        };
        let selection = WebLinkListSelection::build(params).unwrap();
        assert!(selection.filter.category.is_none());
        assert_eq!(selection.limit, DEFAULT_WEB_LINK_PAGE_LIMIT);
    }
}
