//! Following: the feed of followed authors and the follow toggles.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use quill_common::{AppResult, Page};
use quill_core::PostView;
use serde::Serialize;

use super::PageQuery;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Rendered, to_profile},
};

#[derive(Serialize)]
pub struct FollowContext {
    pub page_obj: Page<PostView>,
}

/// Posts by the authors the current user follows.
pub async fn follow_index(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Rendered<FollowContext>> {
    let page_obj = state
        .post_service
        .list_followed(&user.id, query.page.as_deref())
        .await?;

    Ok(Rendered::new("posts/follow.html", FollowContext { page_obj }))
}

/// Follow an author, then show their profile.
pub async fn profile_follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Redirect> {
    let author = state.follow_service.follow(&user, &username).await?;
    Ok(to_profile(&author.username))
}

/// Stop following an author, then show their profile.
pub async fn profile_unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Redirect> {
    let author = state.follow_service.unfollow(&user, &username).await?;
    Ok(to_profile(&author.username))
}
