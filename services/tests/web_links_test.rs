//! Integration tests for the web link endpoints.

mod common;

use common::{create_test_app, image_fixture, web_link_fixture};
use gallery_services::database::MemoryStorage;
use gallery_services::media::MockMediaStorage;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_create_web_link() {
    let app = create_test_app(MemoryStorage::new(), MockMediaStorage::new());

    let (status, body) = common::send_json(
        app,
        "POST",
        "/web-links/create",
        json!({
            "title": "Our first trip",
            "url": "https://example.com/trip",
            "description": "Photos from the coast",
            "tags": ["Trip", " coast "],
            "category": "moments",
            "metadata": {"siteName": "Example"}
        }),
    )
    .await;

    assert_eq!(status, 201);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Web link created successfully");
    assert_eq!(body["data"]["category"], "moments");
    assert_eq!(body["data"]["tags"], json!(["trip", "coast"]));
    assert_eq!(body["data"]["backgroundColor"], "#ec4899");
    assert_eq!(body["data"]["visitCount"], 0);
    assert_eq!(body["data"]["imageCount"], 0);
    assert_eq!(body["data"]["recentImages"], json!([]));
    assert_eq!(body["data"]["metadata"]["siteName"], "Example");
}

#[tokio::test]
async fn test_create_reports_field_errors() {
    let app = create_test_app(MemoryStorage::new(), MockMediaStorage::new());

    let (status, body) = common::send_json(
        app,
        "POST",
        "/web-links/create",
        json!({
            "url": "ftp://example.com",
            "backgroundColor": "pink",
            "tags": (0..21).map(|n| format!("t{n}")).collect::<Vec<_>>()
        }),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "Validation failed");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"url"));
    assert!(fields.contains(&"backgroundColor"));
    assert!(fields.contains(&"tags"));
}

#[tokio::test]
async fn test_duplicate_active_url_conflicts_but_inactive_url_is_reusable() {
    let storage = MemoryStorage::new();
    let mut inactive = web_link_fixture(0);
    inactive.url = "https://example.com/old".to_owned();
    inactive.is_active = false;
    storage.seed_web_link(inactive);
    let active = web_link_fixture(1);
    storage.seed_web_link(active.clone());
    let app = create_test_app(storage, MockMediaStorage::new());

    let (status, _) = common::send_json(
        app.clone(),
        "POST",
        "/web-links/create",
        json!({"title": "Dup", "url": active.url}),
    )
    .await;
    assert_eq!(status, 409);

    // The inactive link's URL can be bookmarked again.
    let (status, _) = common::send_json(
        app,
        "POST",
        "/web-links/create",
        json!({"title": "Again", "url": "https://example.com/old"}),
    )
    .await;
    assert_eq!(status, 201);
}

#[tokio::test]
async fn test_list_with_recent_images_and_statistics() {
    let storage = MemoryStorage::new();
    let link = web_link_fixture(0);
    storage.seed_web_link(link.clone());
    for n in 0..5 {
        let mut image = image_fixture(n);
        image.web_link_id = Some(link.id);
        storage.seed_image(image);
    }
    let app = create_test_app(storage, MockMediaStorage::new());

    let (status, body) = common::get_json(app, "/web-links").await;

    assert_eq!(status, 200);
    let links = body["data"]["webLinks"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["imageCount"], 5);
    // Only the three newest thumbnails ride along, newest first.
    let recent = links[0]["recentImages"].as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0]["caption"], "Image 4");
    assert_eq!(recent[2]["caption"], "Image 2");

    let stats = &body["data"]["statistics"];
    assert_eq!(stats["overview"]["totalLinks"], 1);
    assert_eq!(stats["categories"][0]["category"], "memories");
    assert_eq!(stats["categories"][0]["count"], 1);
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let storage = MemoryStorage::new();
    let mut gifts = web_link_fixture(0);
    gifts.category = "gifts".to_owned();
    storage.seed_web_link(gifts);
    let mut inactive = web_link_fixture(1);
    inactive.is_active = false;
    storage.seed_web_link(inactive);
    storage.seed_web_link(web_link_fixture(2));
    let app = create_test_app(storage, MockMediaStorage::new());

    // Inactive links are hidden by default.
    let (_, body) = common::get_json(app.clone(), "/web-links").await;
    assert_eq!(body["data"]["webLinks"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["pagination"]["total"], 2);

    let (_, body) = common::get_json(app.clone(), "/web-links?includeInactive=true").await;
    assert_eq!(body["data"]["webLinks"].as_array().unwrap().len(), 3);

    let (_, body) = common::get_json(app.clone(), "/web-links?category=gifts").await;
    assert_eq!(body["data"]["webLinks"].as_array().unwrap().len(), 1);

    let (_, body) = common::get_json(app.clone(), "/web-links?limit=1&offset=1").await;
    assert_eq!(body["data"]["webLinks"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["hasMore"], false);
    assert_eq!(body["data"]["pagination"]["currentPage"], 2);

    // Unknown category and out-of-range limit are rejected.
    let (status, body) = common::get_json(app.clone(), "/web-links?category=misc").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid query parameters");
    let (status, _) = common::get_json(app, "/web-links?limit=101").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_offset_past_representable_range_is_rejected() {
    let storage = MemoryStorage::new();
    storage.seed_web_link(web_link_fixture(0));
    let app = create_test_app(storage, MockMediaStorage::new());

    let (status, body) =
        common::get_json(app, "/web-links?offset=18446744073709551615").await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid query parameters");
}

#[tokio::test]
async fn test_sort_by_last_visited_puts_never_visited_last() {
    let storage = MemoryStorage::new();
    let mut visited = web_link_fixture(0);
    visited.last_visited = Some(common::base_time());
    let never_visited = web_link_fixture(1);
    storage.seed_web_link(visited);
    storage.seed_web_link(never_visited);
    let app = create_test_app(storage, MockMediaStorage::new());

    for order in ["asc", "desc"] {
        let (status, body) = common::get_json(
            app.clone(),
            &format!("/web-links?sortBy=lastVisited&sortOrder={order}"),
        )
        .await;
        assert_eq!(status, 200);
        let links = body["data"]["webLinks"].as_array().unwrap();
        assert_eq!(links[0]["title"], "Link 0");
        assert_eq!(links[1]["title"], "Link 1");
    }
}

#[tokio::test]
async fn test_sort_by_visit_count() {
    let storage = MemoryStorage::new();
    let mut quiet = web_link_fixture(0);
    quiet.visit_count = 1;
    let mut busy = web_link_fixture(1);
    busy.visit_count = 9;
    storage.seed_web_link(quiet);
    storage.seed_web_link(busy);
    let app = create_test_app(storage, MockMediaStorage::new());

    let (_, body) = common::get_json(app.clone(), "/web-links?sortBy=visitCount").await;
    assert_eq!(body["data"]["webLinks"][0]["visitCount"], 9);

    let (status, _) = common::get_json(app, "/web-links?sortBy=popularity").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_visit_increments_counter() {
    let storage = MemoryStorage::new();
    let link = web_link_fixture(0);
    storage.seed_web_link(link.clone());
    let app = create_test_app(storage, MockMediaStorage::new());
    let uri = format!("/web-links?id={}&action=visit", link.id);

    let (status, body) = common::send_empty(app.clone(), "PATCH", &uri).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["visitCount"], 1);
    assert!(body["data"]["lastVisited"].is_string());

    let (_, body) = common::send_empty(app.clone(), "PATCH", &uri).await;
    assert_eq!(body["data"]["visitCount"], 2);

    // Missing action, malformed id, unknown id.
    let (status, _) =
        common::send_empty(app.clone(), "PATCH", &format!("/web-links?id={}", link.id)).await;
    assert_eq!(status, 400);
    let (status, _) =
        common::send_empty(app.clone(), "PATCH", "/web-links?id=garbage&action=visit").await;
    assert_eq!(status, 400);
    let (status, _) = common::send_empty(
        app,
        "PATCH",
        &format!("/web-links?id={}&action=visit", Uuid::new_v4()),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_statistics_aggregate_popular_tags() {
    let storage = MemoryStorage::new();
    let mut a = web_link_fixture(0);
    a.tags = vec!["trip".to_owned(), "coast".to_owned()];
    a.visit_count = 4;
    let mut b = web_link_fixture(1);
    b.tags = vec!["trip".to_owned()];
    b.visit_count = 2;
    storage.seed_web_link(a);
    storage.seed_web_link(b);
    let app = create_test_app(storage, MockMediaStorage::new());

    let (_, body) = common::get_json(app, "/web-links").await;

    let stats = &body["data"]["statistics"];
    assert_eq!(stats["popularTags"][0]["name"], "trip");
    assert_eq!(stats["popularTags"][0]["count"], 2);
    assert_eq!(stats["overview"]["totalVisits"], 6);
    assert_eq!(stats["overview"]["avgVisitsPerLink"], 3.0);
}
