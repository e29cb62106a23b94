//! Post service.

use std::collections::HashMap;

use chrono::Utc;
use quill_common::{AppError, AppResult, IdGenerator, Page, Paginator};
use quill_db::{
    entities::{group, post, user},
    repositories::{GroupRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;
use tracing::{info, warn};

use crate::forms::{CleanedPost, FormErrors, ImageChange, PostForm};
use crate::services::media::MediaService;

/// A post with the records it references, as list and detail pages show it.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    /// The post itself; its fields are serialized at the top level.
    #[serde(flatten)]
    pub post: post::Model,
    pub author: user::Model,
    pub group: Option<group::Model>,
    /// Public URL of the attached image.
    pub image_url: Option<String>,
}

/// Result of checking who may edit a post.
#[derive(Debug, Clone)]
pub enum EditAccess {
    /// The user wrote the post.
    Owner(post::Model),
    /// Someone else wrote it.
    NotOwner(post::Model),
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    media: MediaService,
    paginator: Paginator,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        media: MediaService,
        paginator: Paginator,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            media,
            paginator,
            id_gen: IdGenerator::new(),
        }
    }

    /// One page of all posts.
    pub async fn list_all(&self, raw_page: Option<&str>) -> AppResult<Page<PostView>> {
        let page = self.post_repo.page_all(self.paginator, raw_page).await?;
        self.hydrate_page(page).await
    }

    /// A group and one page of its posts.
    pub async fn list_by_group(
        &self,
        slug: &str,
        raw_page: Option<&str>,
    ) -> AppResult<(group::Model, Page<PostView>)> {
        let group = self.group_repo.get_by_slug(slug).await?;
        let page = self
            .post_repo
            .page_by_group(&group.id, self.paginator, raw_page)
            .await?;
        Ok((group, self.hydrate_page(page).await?))
    }

    /// An author and one page of their posts.
    pub async fn list_by_author(
        &self,
        username: &str,
        raw_page: Option<&str>,
    ) -> AppResult<(user::Model, Page<PostView>)> {
        let author = self.user_repo.get_by_username(username).await?;
        let page = self
            .post_repo
            .page_by_author(&author.id, self.paginator, raw_page)
            .await?;
        Ok((author, self.hydrate_page(page).await?))
    }

    /// One page of posts by the authors `user_id` follows.
    pub async fn list_followed(
        &self,
        user_id: &str,
        raw_page: Option<&str>,
    ) -> AppResult<Page<PostView>> {
        let page = self
            .post_repo
            .page_followed_by(user_id, self.paginator, raw_page)
            .await?;
        self.hydrate_page(page).await
    }

    /// A single post with its author and group.
    pub async fn get(&self, post_id: &str) -> AppResult<PostView> {
        let post = self.post_repo.get_by_id(post_id).await?;
        self.hydrate(vec![post])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))
    }

    /// Groups a post may be filed under.
    pub async fn group_choices(&self) -> AppResult<Vec<group::Model>> {
        self.group_repo.find_all().await
    }

    /// Public URL of a stored image.
    #[must_use]
    pub fn image_url(&self, key: &str) -> String {
        self.media.url(key)
    }

    /// Validate `form` and publish it as a new post by `author`.
    pub async fn create(
        &self,
        author: &user::Model,
        form: &PostForm,
    ) -> AppResult<Result<post::Model, FormErrors>> {
        let cleaned = match form.clean(&self.group_repo).await? {
            Ok(cleaned) => cleaned,
            Err(errors) => return Ok(Err(errors)),
        };

        let image_key = self.store_image(&cleaned).await?;

        let mut model = cleaned.into_new(image_key.clone());
        model.id = Set(self.id_gen.generate());
        model.author_id = Set(author.id.clone());
        model.created_at = Set(Utc::now().into());

        let post = match self.post_repo.create(model).await {
            Ok(post) => post,
            Err(e) => {
                self.discard_image(image_key.as_deref()).await;
                return Err(e);
            }
        };
        info!(post_id = %post.id, author = %author.username, "Post created");

        Ok(Ok(post))
    }

    /// Load a post and decide whether `user_id` may edit it.
    pub async fn edit_access(&self, user_id: &str, post_id: &str) -> AppResult<EditAccess> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.author_id == user_id {
            Ok(EditAccess::Owner(post))
        } else {
            Ok(EditAccess::NotOwner(post))
        }
    }

    /// Validate `form` and apply it to `post`.
    ///
    /// Callers must have established ownership through [`Self::edit_access`].
    pub async fn update(
        &self,
        post: post::Model,
        form: &PostForm,
    ) -> AppResult<Result<post::Model, FormErrors>> {
        let cleaned = match form.clean(&self.group_repo).await? {
            Ok(cleaned) => cleaned,
            Err(errors) => return Ok(Err(errors)),
        };

        let image_key = self.store_image(&cleaned).await?;
        let previous_image = match cleaned.image {
            ImageChange::Keep => None,
            ImageChange::Clear | ImageChange::Replace(_) => post.image.clone(),
        };

        let updated = match self
            .post_repo
            .update(cleaned.apply_to(post, image_key.clone()))
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                self.discard_image(image_key.as_deref()).await;
                return Err(e);
            }
        };
        info!(post_id = %updated.id, "Post updated");

        if let Some(key) = previous_image {
            self.release_image(&key).await;
        }

        Ok(Ok(updated))
    }

    async fn store_image(&self, cleaned: &CleanedPost) -> AppResult<Option<String>> {
        match &cleaned.image {
            ImageChange::Replace(upload) => Ok(Some(self.media.store_post_image(upload).await?)),
            ImageChange::Keep | ImageChange::Clear => Ok(None),
        }
    }

    /// Delete an image stored for a write that did not happen.
    async fn discard_image(&self, key: Option<&str>) {
        if let Some(key) = key {
            if let Err(e) = self.media.delete(key).await {
                warn!(error = %e, key, "Failed to discard unsaved image");
            }
        }
    }

    /// Delete a detached image file once no post references it.
    async fn release_image(&self, key: &str) {
        match self.post_repo.image_in_use(key).await {
            Ok(false) => {
                if let Err(e) = self.media.delete(key).await {
                    warn!(error = %e, key, "Failed to delete detached image");
                }
            }
            Ok(true) => {}
            Err(e) => warn!(error = %e, key, "Failed to check image usage"),
        }
    }

    async fn hydrate_page(&self, page: Page<post::Model>) -> AppResult<Page<PostView>> {
        let Page {
            object_list,
            number,
            num_pages,
            count,
            has_next,
            has_previous,
            next_page_number,
            previous_page_number,
        } = page;

        Ok(Page {
            object_list: self.hydrate(object_list).await?,
            number,
            num_pages,
            count,
            has_next,
            has_previous,
            next_page_number,
            previous_page_number,
        })
    }

    /// Attach authors, groups and image URLs, keeping order.
    async fn hydrate(&self, posts: Vec<post::Model>) -> AppResult<Vec<PostView>> {
        let mut author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let mut group_ids: Vec<String> = posts.iter().filter_map(|p| p.group_id.clone()).collect();
        group_ids.sort_unstable();
        group_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let groups: HashMap<String, group::Model> = self
            .group_repo
            .find_by_ids(&group_ids)
            .await?
            .into_iter()
            .map(|g| (g.id.clone(), g))
            .collect();

        posts
            .into_iter()
            .map(|post| -> AppResult<PostView> {
                let author = authors
                    .get(&post.author_id)
                    .cloned()
                    .ok_or_else(|| AppError::UserNotFound(post.author_id.clone()))?;
                let group = post.group_id.as_ref().and_then(|id| groups.get(id)).cloned();
                let image_url = post.image.as_deref().map(|key| self.media.url(key));
                Ok(PostView {
                    post,
                    author,
                    group,
                    image_url,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quill_common::LocalStorage;
    use crate::forms::ImageUpload;
    use crate::testing::TINY_GIF;
    use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn temp_media_root() -> PathBuf {
        std::env::temp_dir().join(format!("quill-post-media-{}", IdGenerator::new().generate()))
    }

    fn gif_form(text: &str) -> PostForm {
        PostForm {
            text: text.to_string(),
            image: Some(ImageUpload {
                file_name: "small.gif".to_string(),
                content_type: Some("image/gif".to_string()),
                data: TINY_GIF.to_vec(),
            }),
            ..Default::default()
        }
    }

    fn test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            name: None,
            token: None,
            created_at: Utc::now().into(),
        }
    }

    fn test_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            text: format!("text of {id}"),
            author_id: author_id.to_string(),
            group_id: None,
            image: None,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> PostService {
        service_with_media(db, std::env::temp_dir().join("quill-post-service"))
    }

    fn service_with_media(db: DatabaseConnection, media_root: PathBuf) -> PostService {
        let db = Arc::new(db);
        let storage = Arc::new(LocalStorage::new(media_root, "/media".to_string()));
        PostService::new(
            PostRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            GroupRepository::new(db),
            MediaService::new(storage),
            Paginator::default(),
        )
    }

    #[tokio::test]
    async fn test_get_hydrates_author() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_post("p1", "u1")]])
            .append_query_results([[test_user("u1", "leo")]])
            .into_connection();

        let view = service(db).get("p1").await.unwrap();

        assert_eq!(view.post.id, "p1");
        assert_eq!(view.author.username, "leo");
        assert!(view.group.is_none());
        assert!(view.image_url.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_post() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection();

        let result = service(db).get("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_sets_author_from_session() {
        let author = test_user("u1", "leo");
        let created = test_post("p1", "u1");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[created.clone()]])
            .into_connection();

        let form = PostForm {
            text: "text of p1".to_string(),
            ..Default::default()
        };
        let post = service(db).create(&author, &form).await.unwrap().unwrap();

        assert_eq!(post.author_id, "u1");
    }

    #[tokio::test]
    async fn test_create_invalid_does_not_write() {
        // No results queued: any write would fail the test.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let form = PostForm::default();
        let errors = service(db)
            .create(&test_user("u1", "leo"), &form)
            .await
            .unwrap()
            .unwrap_err();

        assert!(errors.has("text"));
    }

    #[tokio::test]
    async fn test_failed_create_discards_stored_image() {
        let root = temp_media_root();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("insert rejected".to_string())])
            .into_connection();

        let result = service_with_media(db, root.clone())
            .create(&test_user("u1", "leo"), &gif_form("Pic"))
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(!root.join("posts/small.gif").exists());

        tokio::fs::remove_dir_all(root).await.ok();
    }

    #[tokio::test]
    async fn test_failed_update_discards_stored_image() {
        let root = temp_media_root();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("update rejected".to_string())])
            .into_connection();

        let result = service_with_media(db, root.clone())
            .update(test_post("p1", "u1"), &gif_form("Pic"))
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(!root.join("posts/small.gif").exists());

        tokio::fs::remove_dir_all(root).await.ok();
    }

    #[tokio::test]
    async fn test_edit_access() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_post("p1", "u1")]])
            .append_query_results([[test_post("p1", "u1")]])
            .into_connection();
        let service = service(db);

        assert!(matches!(
            service.edit_access("u1", "p1").await.unwrap(),
            EditAccess::Owner(_)
        ));
        assert!(matches!(
            service.edit_access("u2", "p1").await.unwrap(),
            EditAccess::NotOwner(_)
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_author() {
        let original = test_post("p1", "u1");
        let mut updated = original.clone();
        updated.text = "edited".to_string();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[updated.clone()]])
            .into_connection();

        let form = PostForm {
            text: "edited".to_string(),
            ..Default::default()
        };
        let post = service(db).update(original, &form).await.unwrap().unwrap();

        assert_eq!(post.text, "edited");
        assert_eq!(post.author_id, "u1");
    }

    #[tokio::test]
    async fn test_list_all_paginates() {
        let posts: Vec<post::Model> = (0..10).map(|i| test_post(&format!("p{i}"), "u1")).collect();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(13))
            }]])
            .append_query_results([posts])
            .append_query_results([[test_user("u1", "leo")]])
            .into_connection();

        let page = service(db).list_all(None).await.unwrap();

        assert_eq!(page.len(), 10);
        assert_eq!(page.num_pages, 2);
        assert!(page.has_next);
        assert!(page.object_list.iter().all(|p| p.author.username == "leo"));
    }
}
