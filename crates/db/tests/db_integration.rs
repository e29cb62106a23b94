//! Database integration tests.
//!
//! These run the real migrations against an in-memory `SQLite` database.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use quill_common::{IdGenerator, Paginator};
use quill_db::{
    entities::{Follow, follow, group, post, user},
    repositories::{
        CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
    },
    test_utils::TestDatabase,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};

async fn setup() -> Arc<DatabaseConnection> {
    let db = TestDatabase::new().await.expect("Failed to create test database");
    Arc::new(db.conn)
}

async fn insert_user(db: &DatabaseConnection, username: &str) -> user::Model {
    user::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        username: Set(username.to_string()),
        name: Set(None),
        token: Set(Some(format!("{username}-token"))),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_group(db: &DatabaseConnection, slug: &str) -> group::Model {
    group::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        title: Set(format!("Group {slug}")),
        slug: Set(slug.to_string()),
        description: Set(String::new()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_post(
    db: &DatabaseConnection,
    author: &user::Model,
    group: Option<&group::Model>,
    seconds_ago: i64,
) -> post::Model {
    post::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        text: Set(format!("by {} {seconds_ago}s ago", author.username)),
        author_id: Set(author.id.clone()),
        group_id: Set(group.map(|g| g.id.clone())),
        image: Set(None),
        created_at: Set((Utc::now() - Duration::seconds(seconds_ago)).into()),
    }
    .insert(db)
    .await
    .unwrap()
}

fn follow_model(user: &user::Model, author: &user::Model) -> follow::ActiveModel {
    follow::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        user_id: Set(user.id.clone()),
        author_id: Set(author.id.clone()),
        created_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
async fn test_database_connection() {
    let db = TestDatabase::new().await.unwrap();

    let result = db
        .connection()
        .execute(sea_orm::Statement::from_string(
            db.connection().get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await;

    assert!(result.is_ok(), "Query failed: {:?}", result.err());
}

#[tokio::test]
async fn test_database_cleanup() {
    let db = TestDatabase::new().await.unwrap();
    insert_user(db.connection(), "leo").await;

    db.cleanup().await.unwrap();

    let repo = UserRepository::new(Arc::new(db.conn));
    assert!(repo.find_by_username("leo").await.unwrap().is_none());
}

#[tokio::test]
async fn test_posts_paginate_newest_first() {
    let db = setup().await;
    let author = insert_user(&db, "leo").await;
    for i in 0..13 {
        insert_post(&db, &author, None, i).await;
    }

    let repo = PostRepository::new(db);
    let first = repo.page_all(Paginator::new(10), None).await.unwrap();
    let second = repo.page_all(Paginator::new(10), Some("2")).await.unwrap();

    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 3);
    assert_eq!(first.count, 13);
    assert!(first.object_list[0].created_at > first.object_list[9].created_at);
    assert!(first.object_list[9].created_at > second.object_list[0].created_at);
}

#[tokio::test]
async fn test_group_and_author_filters() {
    let db = setup().await;
    let leo = insert_user(&db, "leo").await;
    let mia = insert_user(&db, "mia").await;
    let cats = insert_group(&db, "cats").await;
    let dogs = insert_group(&db, "dogs").await;

    let in_cats = insert_post(&db, &leo, Some(&cats), 3).await;
    insert_post(&db, &mia, Some(&dogs), 2).await;
    insert_post(&db, &mia, None, 1).await;

    let repo = PostRepository::new(db);

    let cats_page = repo
        .page_by_group(&cats.id, Paginator::default(), None)
        .await
        .unwrap();
    assert_eq!(cats_page.count, 1);
    assert_eq!(cats_page.object_list[0].id, in_cats.id);

    let dogs_page = repo
        .page_by_group(&dogs.id, Paginator::default(), None)
        .await
        .unwrap();
    assert!(dogs_page.object_list.iter().all(|p| p.id != in_cats.id));

    let mia_page = repo
        .page_by_author(&mia.id, Paginator::default(), None)
        .await
        .unwrap();
    assert_eq!(mia_page.count, 2);
}

#[tokio::test]
async fn test_follow_feed_only_contains_followed_authors() {
    let db = setup().await;
    let reader = insert_user(&db, "reader").await;
    let followed = insert_user(&db, "followed").await;
    let other = insert_user(&db, "other").await;

    let wanted = insert_post(&db, &followed, None, 2).await;
    insert_post(&db, &other, None, 1).await;

    let follows = FollowRepository::new(db.clone());
    follows
        .create_if_absent(follow_model(&reader, &followed))
        .await
        .unwrap();

    let posts = PostRepository::new(db);

    let feed = posts
        .page_followed_by(&reader.id, Paginator::default(), None)
        .await
        .unwrap();
    assert_eq!(feed.count, 1);
    assert_eq!(feed.object_list[0].id, wanted.id);

    let empty = posts
        .page_followed_by(&other.id, Paginator::default(), None)
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_follow_pair_is_unique() {
    let db = setup().await;
    let reader = insert_user(&db, "reader").await;
    let author = insert_user(&db, "author").await;

    let repo = FollowRepository::new(Arc::clone(&db));
    repo.create_if_absent(follow_model(&reader, &author))
        .await
        .unwrap();
    repo.create_if_absent(follow_model(&reader, &author))
        .await
        .unwrap();

    let edges = Follow::find()
        .filter(follow::Column::UserId.eq(reader.id.clone()))
        .count(db.as_ref())
        .await
        .unwrap();
    assert_eq!(edges, 1);

    assert!(repo.delete_by_pair(&reader.id, &author.id).await.unwrap());
    assert!(!repo.is_following(&reader.id, &author.id).await.unwrap());
}

#[tokio::test]
async fn test_self_follow_rejected_by_schema() {
    let db = setup().await;
    let leo = insert_user(&db, "leo").await;

    let repo = FollowRepository::new(db);
    let result = repo.create_if_absent(follow_model(&leo, &leo)).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_deleting_post_removes_comments() {
    let db = setup().await;
    let leo = insert_user(&db, "leo").await;
    let post = insert_post(&db, &leo, None, 0).await;

    let comments = CommentRepository::new(db.clone());
    comments
        .create(quill_db::entities::comment::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            post_id: Set(post.id.clone()),
            author_id: Set(leo.id.clone()),
            text: Set("first".to_string()),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();
    assert_eq!(comments.find_by_post(&post.id).await.unwrap().len(), 1);

    PostRepository::new(db).delete(&post.id).await.unwrap();

    assert!(comments.find_by_post(&post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_group_slug_lookup() {
    let db = setup().await;
    insert_group(&db, "cats").await;

    let repo = GroupRepository::new(db);
    assert!(repo.find_by_slug("cats").await.unwrap().is_some());
    assert!(repo.find_by_slug("CATS").await.unwrap().is_none());
}
