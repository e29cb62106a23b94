//! Post pages: index, detail, create, edit and commenting.

use axum::{
    Form,
    extract::{Path, Query, State, rejection::FormRejection},
    response::{IntoResponse, Response},
};
use quill_common::{AppResult, Page};
use quill_core::{
    CommentForm, CommentView, EditAccess, FormErrors, PostForm, PostView, forms::FormView,
};
use quill_db::entities::post;
use serde::Serialize;
use tracing::debug;

use super::PageQuery;
use crate::{
    extractors::{AuthUser, PostSubmission},
    middleware::AppState,
    response::{Rendered, to_post, to_profile},
};

#[derive(Serialize)]
pub struct IndexContext {
    pub page_obj: Page<PostView>,
}

#[derive(Serialize)]
pub struct PostDetailContext {
    pub title: String,
    pub post: PostView,
    pub form: FormView,
    pub comments: Vec<CommentView>,
}

#[derive(Serialize)]
pub struct PostFormContext {
    pub form: FormView,
    pub is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<post::Model>,
}

/// Front page: every post, newest first.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Rendered<IndexContext>> {
    let page_obj = state.post_service.list_all(query.page.as_deref()).await?;
    Ok(Rendered::new("posts/index.html", IndexContext { page_obj }))
}

/// One post with its comments and an empty comment form.
pub async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Rendered<PostDetailContext>> {
    let post = state.post_service.get(&post_id).await?;
    let comments = state.comment_service.list_for_post(&post_id).await?;

    Ok(Rendered::new(
        "posts/post_detail.html",
        PostDetailContext {
            title: post.post.text.clone(),
            post,
            form: CommentForm::default().view(false, &FormErrors::new()),
            comments,
        },
    ))
}

async fn render_post_form(
    state: &AppState,
    form: &PostForm,
    is_bound: bool,
    errors: &FormErrors,
    post: Option<post::Model>,
) -> AppResult<Rendered<PostFormContext>> {
    let groups = state.post_service.group_choices().await?;
    let current_image = post
        .as_ref()
        .and_then(|p| p.image.as_deref())
        .map(|key| state.post_service.image_url(key));

    Ok(Rendered::new(
        "posts/create_post.html",
        PostFormContext {
            form: form.view(is_bound, errors, &groups, current_image),
            is_edit: post.is_some(),
            post,
        },
    ))
}

/// Empty post form.
pub async fn create_form(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Rendered<PostFormContext>> {
    render_post_form(&state, &PostForm::default(), false, &FormErrors::new(), None).await
}

/// Publish a post as the current user.
pub async fn create_submit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    PostSubmission(form): PostSubmission,
) -> AppResult<Response> {
    match state.post_service.create(&user, &form).await? {
        Ok(_) => Ok(to_profile(&user.username).into_response()),
        Err(errors) => Ok(render_post_form(&state, &form, true, &errors, None)
            .await?
            .into_response()),
    }
}

/// Post form pre-filled for its author; anyone else goes back to the post.
pub async fn edit_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Response> {
    match state.post_service.edit_access(&user.id, &post_id).await? {
        EditAccess::Owner(post) => {
            let form = PostForm::from_post(&post);
            Ok(render_post_form(&state, &form, false, &FormErrors::new(), Some(post))
                .await?
                .into_response())
        }
        EditAccess::NotOwner(post) => {
            debug!(post_id = %post.id, user = %user.username, "Edit by non-author redirected");
            Ok(to_post(&post.id).into_response())
        }
    }
}

/// Apply an edit by the post's author.
pub async fn edit_submit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    PostSubmission(form): PostSubmission,
) -> AppResult<Response> {
    let post = match state.post_service.edit_access(&user.id, &post_id).await? {
        EditAccess::Owner(post) => post,
        EditAccess::NotOwner(post) => {
            debug!(post_id = %post.id, user = %user.username, "Edit by non-author redirected");
            return Ok(to_post(&post.id).into_response());
        }
    };

    match state.post_service.update(post.clone(), &form).await? {
        Ok(updated) => Ok(to_post(&updated.id).into_response()),
        Err(errors) => Ok(render_post_form(&state, &form, true, &errors, Some(post))
            .await?
            .into_response()),
    }
}

/// Add a comment; always lands back on the post.
pub async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    form: Result<Form<CommentForm>, FormRejection>,
) -> AppResult<Response> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    state.comment_service.add(&user, &post_id, &form).await?;
    Ok(to_post(&post_id).into_response())
}
