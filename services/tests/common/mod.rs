//! Shared test utilities for integration tests.
//!
//! Builds the application router over `MemoryStorage` and `MockMediaStorage`
//! and provides row fixtures with deterministic, strictly increasing
//! timestamps so ordering assertions are stable.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Duration, TimeZone, Utc};
use gallery_services::config::Config;
use gallery_services::database::{GroupRow, ImageRow, MemoryStorage, WebLinkRow};
use gallery_services::media::MockMediaStorage;
use gallery_services::routes;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

/// Create the test app router with default test configuration.
pub fn create_test_app(storage: MemoryStorage, media: MockMediaStorage) -> Router {
    routes(storage, media, Config::new_for_test())
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
        .single()
        .expect("base time is valid")
}

/// An image row created `n` minutes after the base time.
pub fn image_fixture(n: u32) -> ImageRow {
    let at = base_time() + Duration::minutes(n as i64);
    ImageRow {
        id: Uuid::new_v4(),
        url: format!("https://media.invalid/img-{n}.jpg"),
        storage_id: format!("gallery/img-{n}"),
        caption: format!("Image {n}"),
        group_id: None,
        web_link_id: None,
        taken_at: at,
        is_favorite: false,
        width: Some(800),
        height: Some(600),
        format: Some("jpg".to_owned()),
        size_bytes: Some(1024),
        original_filename: Some(format!("img-{n}.jpg")),
        tags: Vec::new(),
        created_at: at,
        updated_at: at,
    }
}

#[allow(dead_code)]
pub fn group_fixture(name: &str) -> GroupRow {
    let at = base_time();
    GroupRow {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        description: String::new(),
        date_start: None,
        date_end: None,
        created_at: at,
        updated_at: at,
    }
}

/// A web link row created `n` minutes after the base time.
#[allow(dead_code)]
pub fn web_link_fixture(n: u32) -> WebLinkRow {
    let at = base_time() + Duration::minutes(n as i64);
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

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body is readable");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, value)
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

pub async fn send_json(app: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

#[allow(dead_code)]
pub async fn send_raw(
    app: Router,
    method: &str,
    uri: &str,
    content_type: &str,
    body: &str,
) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

#[allow(dead_code)]
pub async fn send_empty(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

/// Build a multipart/form-data request body by hand.
#[allow(dead_code)]
pub struct MultipartBuilder {
    boundary: String,
    body: Vec<u8>,
}

#[allow(dead_code)]
impl MultipartBuilder {
    pub fn new() -> Self {
        Self {
            boundary: "gallery-test-boundary".to_owned(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn build(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

#[allow(dead_code)]
pub async fn send_multipart(
    app: Router,
    uri: &str,
    builder: MultipartBuilder,
) -> (StatusCode, Value) {
    let (content_type, body) = builder.build();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}
