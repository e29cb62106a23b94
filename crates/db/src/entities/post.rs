//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Characters of text shown where a post is named in a single line.
pub const PREVIEW_LENGTH: usize = 15;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    /// Set from the session on creation, never changed afterwards
    #[sea_orm(indexed)]
    pub author_id: String,

    #[sea_orm(indexed, nullable)]
    pub group_id: Option<String>,

    /// Storage key of the attached image
    #[sea_orm(nullable)]
    pub image: Option<String>,

    #[sea_orm(indexed)]
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// First [`PREVIEW_LENGTH`] characters of the text.
    #[must_use]
    pub fn preview(&self) -> String {
        self.text.chars().take(PREVIEW_LENGTH).collect()
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.preview())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "SetNull"
    )]
    Group,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post_with_text(text: &str) -> Model {
        Model {
            id: "p1".to_string(),
            text: text.to_string(),
            author_id: "u1".to_string(),
            group_id: None,
            image: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_preview_truncates_to_fifteen_chars() {
        let post = post_with_text("Тестовый пост Тестовый пост Тестовый пост");
        assert_eq!(post.preview(), "Тестовый пост Т");
        assert_eq!(post.to_string(), post.preview());
    }

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(post_with_text("hello").preview(), "hello");
    }
}
