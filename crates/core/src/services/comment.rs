//! Comment service.

use std::collections::HashMap;

use chrono::Utc;
use quill_common::{AppResult, IdGenerator};
use quill_db::{
    entities::{comment, user},
    repositories::{CommentRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;
use tracing::{debug, info};

use crate::forms::CommentForm;

/// A comment with its author.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    /// The comment itself; its fields are serialized at the top level.
    #[serde(flatten)]
    pub comment: comment::Model,
    pub author: user::Model,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comments on a post, oldest first, with their authors.
    pub async fn list_for_post(&self, post_id: &str) -> AppResult<Vec<CommentView>> {
        let comments = self.comment_repo.find_by_post(post_id).await?;

        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                let author = authors.get(&comment.author_id).cloned()?;
                Some(CommentView { comment, author })
            })
            .collect())
    }

    /// Add a comment by `author` to a post.
    ///
    /// Fails only when the post does not exist; an invalid form yields `None`
    /// and nothing is written.
    pub async fn add(
        &self,
        author: &user::Model,
        post_id: &str,
        form: &CommentForm,
    ) -> AppResult<Option<comment::Model>> {
        let post = self.post_repo.get_by_id(post_id).await?;

        let Ok(mut model) = form.clean() else {
            debug!(post_id = %post.id, author = %author.username, "Discarded invalid comment");
            return Ok(None);
        };

        model.id = Set(self.id_gen.generate());
        model.post_id = Set(post.id);
        model.author_id = Set(author.id.clone());
        model.created_at = Set(Utc::now().into());

        let comment = self.comment_repo.create(model).await?;
        info!(comment_id = %comment.id, post_id = %comment.post_id, "Comment added");

        Ok(Some(comment))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quill_common::AppError;
    use quill_db::entities::post;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user-{id}"),
            name: None,
            token: None,
            created_at: Utc::now().into(),
        }
    }

    fn test_post() -> post::Model {
        post::Model {
            id: "p1".to_string(),
            text: "hello".to_string(),
            author_id: "u2".to_string(),
            group_id: None,
            image: None,
            created_at: Utc::now().into(),
        }
    }

    fn test_comment(id: &str, author_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            post_id: "p1".to_string(),
            author_id: author_id.to_string(),
            text: "Nice".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> CommentService {
        let db = Arc::new(db);
        CommentService::new(
            CommentRepository::new(db.clone()),
            PostRepository::new(db.clone()),
            UserRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_add_valid_comment() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_post()]])
            .append_query_results([[test_comment("c1", "u1")]])
            .into_connection();

        let form = CommentForm {
            text: "Nice".to_string(),
        };
        let comment = service(db).add(&test_user("u1"), "p1", &form).await.unwrap();

        assert_eq!(comment.unwrap().author_id, "u1");
    }

    #[tokio::test]
    async fn test_add_invalid_comment_is_silent() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_post()]])
            .into_connection();

        let result = service(db)
            .add(&test_user("u1"), "p1", &CommentForm::default())
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_add_to_unknown_post() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection();

        let form = CommentForm {
            text: "Nice".to_string(),
        };
        let result = service(db).add(&test_user("u1"), "nope", &form).await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_for_post_attaches_authors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_comment("c1", "u1"), test_comment("c2", "u1")]])
            .append_query_results([[test_user("u1")]])
            .into_connection();

        let comments = service(db).list_for_post("p1").await.unwrap();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].author.username, "user-u1");
    }
}
