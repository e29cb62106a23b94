//! Post repository.

use std::sync::Arc;

use crate::entities::{Follow, Post, follow, post};
use quill_common::{AppError, AppResult, Page, Paginator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, sea_query::Query,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Newest first; ties broken by id so pages never overlap.
    fn ordered() -> Select<Post> {
        Post::find()
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
    }

    /// Count `query`, resolve the requested page against that count and fetch it.
    async fn fetch_page(
        &self,
        query: Select<Post>,
        paginator: Paginator,
        raw_page: Option<&str>,
    ) -> AppResult<Page<post::Model>> {
        let count = query
            .clone()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let window = paginator.window(raw_page, count);

        let posts = query
            .offset(window.offset)
            .limit(window.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(posts, window))
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Whether a post with this image key exists.
    pub async fn image_in_use(&self, key: &str) -> AppResult<bool> {
        let count = Post::find()
            .filter(post::Column::Image.eq(key))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// One page of all posts.
    pub async fn page_all(
        &self,
        paginator: Paginator,
        raw_page: Option<&str>,
    ) -> AppResult<Page<post::Model>> {
        self.fetch_page(Self::ordered(), paginator, raw_page).await
    }

    /// One page of the posts in a group.
    pub async fn page_by_group(
        &self,
        group_id: &str,
        paginator: Paginator,
        raw_page: Option<&str>,
    ) -> AppResult<Page<post::Model>> {
        let query = Self::ordered().filter(post::Column::GroupId.eq(group_id));
        self.fetch_page(query, paginator, raw_page).await
    }

    /// One page of the posts written by an author.
    pub async fn page_by_author(
        &self,
        author_id: &str,
        paginator: Paginator,
        raw_page: Option<&str>,
    ) -> AppResult<Page<post::Model>> {
        let query = Self::ordered().filter(post::Column::AuthorId.eq(author_id));
        self.fetch_page(query, paginator, raw_page).await
    }

    /// One page of the posts by authors `user_id` follows.
    pub async fn page_followed_by(
        &self,
        user_id: &str,
        paginator: Paginator,
        raw_page: Option<&str>,
    ) -> AppResult<Page<post::Model>> {
        let followed = Query::select()
            .column(follow::Column::AuthorId)
            .from(Follow)
            .and_where(follow::Column::UserId.eq(user_id))
            .to_owned();

        let query = Self::ordered().filter(post::Column::AuthorId.in_subquery(followed));
        self.fetch_page(query, paginator, raw_page).await
    }
}
