//! Application state and authentication middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use quill_common::{Config, Paginator, StorageBackend};
use quill_core::{CommentService, FollowService, GroupService, MediaService, PostService, UserService};
use quill_db::repositories::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};
use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::page_cache::PageCache;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub group_service: GroupService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub follow_service: FollowService,
    pub page_cache: PageCache,
    /// Where anonymous users are sent for protected pages.
    pub login_url: Arc<str>,
    /// Cookie consulted when no bearer token is sent.
    pub session_cookie: Arc<str>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire repositories and services over one database connection.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn StorageBackend>,
        config: &Config,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let group_repo = GroupRepository::new(Arc::clone(&db));
        let post_repo = PostRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let follow_repo = FollowRepository::new(db);

        let post_service = PostService::new(
            post_repo.clone(),
            user_repo.clone(),
            group_repo.clone(),
            MediaService::new(storage),
            Paginator::new(config.pagination.posts_per_page),
        );

        Self {
            user_service: UserService::new(user_repo.clone()),
            group_service: GroupService::new(group_repo),
            post_service,
            comment_service: CommentService::new(comment_repo, post_repo, user_repo.clone()),
            follow_service: FollowService::new(follow_repo, user_repo),
            page_cache: PageCache::new(Duration::from_secs(config.cache.index_ttl_secs)),
            login_url: Arc::from(config.server.login_url.as_str()),
            session_cookie: Arc::from(config.server.session_cookie.as_str()),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

/// Authentication middleware.
///
/// Resolves a `Bearer` token, or failing that the session cookie, and stores
/// the user in the request extensions. Unknown tokens leave the request anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    let token = bearer.or_else(|| {
        jar.get(&state.session_cookie)
            .map(|cookie| cookie.value().to_string())
    });

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => debug!(error = %e, "Ignoring unusable credentials"),
        }
    }

    next.run(req).await
}
