//! Author profile page.

use axum::extract::{Path, Query, State};
use quill_common::{AppResult, Page};
use quill_core::PostView;
use quill_db::entities::user;
use serde::Serialize;

use super::PageQuery;
use crate::{extractors::MaybeAuthUser, middleware::AppState, response::Rendered};

#[derive(Serialize)]
pub struct ProfileContext {
    pub author: user::Model,
    pub page_obj: Page<PostView>,
    /// Whether the viewer follows this author; always false for anonymous viewers.
    pub following: bool,
}

/// An author's posts and whether the viewer follows them.
pub async fn profile(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Rendered<ProfileContext>> {
    let (author, page_obj) = state
        .post_service
        .list_by_author(&username, query.page.as_deref())
        .await?;

    let following = match viewer {
        Some(viewer) => {
            state
                .follow_service
                .is_following(&viewer.id, &author.id)
                .await?
        }
        None => false,
    };

    Ok(Rendered::new(
        "posts/profile.html",
        ProfileContext {
            author,
            page_obj,
            following,
        },
    ))
}
