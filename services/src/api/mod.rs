//! HTTP surface of the gallery.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post};

use crate::AppState;
use crate::database::GalleryStorage;
use crate::media::MediaStorage;

pub mod image_groups;
pub mod images;
pub mod types;
pub mod uploads;
pub mod web_links;

pub fn routes<S, M>() -> Router<AppState<S, M>>
where
    S: GalleryStorage,
    M: MediaStorage,
{
    Router::new()
        .route("/images", get(images::list::<S, M>))
        .route(
            "/images/upload",
            post(uploads::upload::<S, M>).layer(DefaultBodyLimit::max(uploads::MAX_BODY_BYTES)),
        )
        .route(
            "/images/{id}",
            get(images::get::<S, M>)
                .patch(images::update::<S, M>)
                .delete(images::remove::<S, M>),
        )
        .route("/images/{id}/group", patch(images::assign_group::<S, M>))
        .route(
            "/images/{id}/toggle-favorite",
            patch(images::toggle_favorite::<S, M>).get(images::favorite_state::<S, M>),
        )
        .route(
            "/image-groups",
            get(image_groups::list::<S, M>).post(image_groups::create::<S, M>),
        )
        .route("/image-groups/{id}", delete(image_groups::remove::<S, M>))
        .route(
            "/web-links",
            get(web_links::list::<S, M>).patch(web_links::visit::<S, M>),
        )
        .route("/web-links/create", post(web_links::create::<S, M>))
}
