//! Page handlers and routing.

mod follow;
mod groups;
mod posts;
mod profiles;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use quill_common::AppError;
use serde::Deserialize;

use crate::middleware::{AppState, auth_middleware};
use crate::page_cache::cache_pages;

/// The `?page=` parameter of list pages, kept raw for lenient parsing.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Create the application router.
pub fn router(state: AppState) -> Router {
    let index = get(posts::index).layer(from_fn_with_state(
        state.page_cache.clone(),
        cache_pages,
    ));

    Router::new()
        .route("/", index)
        .route("/group/{slug}/", get(groups::group_posts))
        .route("/profile/{username}/", get(profiles::profile))
        .route("/profile/{username}/follow/", get(follow::profile_follow))
        .route("/profile/{username}/unfollow/", get(follow::profile_unfollow))
        .route("/posts/{post_id}/", get(posts::post_detail))
        .route(
            "/posts/{post_id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route(
            "/posts/{post_id}/comment/",
            post(posts::add_comment),
        )
        .route("/create/", get(posts::create_form).post(posts::create_submit))
        .route("/follow/", get(follow::follow_index))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Page not found".to_string())
}
