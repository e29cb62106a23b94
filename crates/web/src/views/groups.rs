//! Group page.

use axum::extract::{Path, Query, State};
use quill_common::{AppResult, Page};
use quill_core::PostView;
use quill_db::entities::group;
use serde::Serialize;

use super::PageQuery;
use crate::{middleware::AppState, response::Rendered};

#[derive(Serialize)]
pub struct GroupListContext {
    pub group: group::Model,
    pub page_obj: Page<PostView>,
}

/// Posts filed under a group.
pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Rendered<GroupListContext>> {
    let (group, page_obj) = state
        .post_service
        .list_by_group(&slug, query.page.as_deref())
        .await?;

    Ok(Rendered::new(
        "posts/group_list.html",
        GroupListContext { group, page_obj },
    ))
}
