//! Comment form.

use quill_db::entities::comment;
use sea_orm::{ActiveValue::NotSet, Set};
use serde::Deserialize;
use validator::Validate;

use super::{FieldView, FormErrors, FormView, validate_required};

const TEXT_HELP: &str = "Напишите сюда текст комментария";

/// Raw comment form submission.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CommentForm {
    #[validate(custom(function = "validate_required"))]
    pub text: String,
}

impl CommentForm {
    /// Validate and bind onto a new comment.
    ///
    /// Post, author, id and timestamp are left for the caller.
    pub fn clean(&self) -> Result<comment::ActiveModel, FormErrors> {
        self.validate()?;

        Ok(comment::ActiveModel {
            id: NotSet,
            post_id: NotSet,
            author_id: NotSet,
            text: Set(self.text.trim().to_string()),
            created_at: NotSet,
        })
    }

    /// Describe the form for rendering.
    #[must_use]
    pub fn view(&self, is_bound: bool, errors: &FormErrors) -> FormView {
        FormView {
            is_bound,
            fields: vec![FieldView {
                name: "text",
                label: "Text",
                required: true,
                help_text: TEXT_HELP,
                value: Some(self.text.clone()),
                choices: None,
                errors: errors.field("text").to_vec(),
            }],
            errors: errors.clone(),
        }
    }
}
