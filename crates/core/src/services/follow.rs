//! Follow service.

use chrono::Utc;
use quill_common::{AppResult, IdGenerator};
use quill_db::{
    entities::{follow, user},
    repositories::{FollowRepository, UserRepository},
};
use sea_orm::Set;
use tracing::info;

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(follow_repo: FollowRepository, user_repo: UserRepository) -> Self {
        Self {
            follow_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow the author named `username`.
    ///
    /// Following yourself or someone already followed is a no-op.
    /// Returns the author.
    pub async fn follow(&self, user: &user::Model, username: &str) -> AppResult<user::Model> {
        let author = self.user_repo.get_by_username(username).await?;

        if author.id == user.id {
            return Ok(author);
        }

        if self.follow_repo.is_following(&user.id, &author.id).await? {
            return Ok(author);
        }

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            author_id: Set(author.id.clone()),
            created_at: Set(Utc::now().into()),
        };
        self.follow_repo.create_if_absent(model).await?;
        info!(user = %user.username, author = %author.username, "Followed author");

        Ok(author)
    }

    /// Stop following the author named `username`. No-op when not following.
    ///
    /// Returns the author.
    pub async fn unfollow(&self, user: &user::Model, username: &str) -> AppResult<user::Model> {
        let author = self.user_repo.get_by_username(username).await?;

        if self.follow_repo.delete_by_pair(&user.id, &author.id).await? {
            info!(user = %user.username, author = %author.username, "Unfollowed author");
        }

        Ok(author)
    }

    /// Check if `user_id` follows `author_id`.
    pub async fn is_following(&self, user_id: &str, author_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(user_id, author_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quill_common::AppError;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            name: None,
            token: None,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> FollowService {
        let db = Arc::new(db);
        FollowService::new(FollowRepository::new(db.clone()), UserRepository::new(db))
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(n))
        }
    }

    #[tokio::test]
    async fn test_follow_creates_edge() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u2", "author")]])
            .append_query_results([[count_row(0)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let author = service(db)
            .follow(&test_user("u1", "reader"), "author")
            .await
            .unwrap();

        assert_eq!(author.id, "u2");
    }

    #[tokio::test]
    async fn test_follow_self_is_noop() {
        // Only the author lookup is queued: any further query would fail.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u1", "reader")]])
            .into_connection();

        let result = service(db).follow(&test_user("u1", "reader"), "reader").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_follow_existing_is_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u2", "author")]])
            .append_query_results([[count_row(1)]])
            .into_connection();

        let result = service(db).follow(&test_user("u1", "reader"), "author").await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_follow_unknown_author() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = service(db).follow(&test_user("u1", "reader"), "ghost").await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_unfollow_without_edge_is_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u2", "author")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let author = service(db)
            .unfollow(&test_user("u1", "reader"), "author")
            .await
            .unwrap();

        assert_eq!(author.username, "author");
    }
}
