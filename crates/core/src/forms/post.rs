//! Post form.

use std::io::Cursor;

use image::{ImageReader, Limits};
use quill_common::AppResult;
use quill_db::{
    entities::{group, post},
    repositories::GroupRepository,
};
use sea_orm::{ActiveValue::NotSet, IntoActiveModel, Set};
use serde::Deserialize;
use validator::Validate;

use super::{
    Choice, FieldView, FormErrors, FormView, INVALID_CHOICE_MESSAGE, INVALID_IMAGE_MESSAGE,
    validate_required,
};

const TEXT_HELP: &str = "Напишите сюда текст сообщения";
const GROUP_HELP: &str = "Выберите группу или оставьте пустой";
const IMAGE_HELP: &str = "Выберите картинку к посту или оставьте пустой";

/// Most memory a single uploaded image may take once decoded.
const MAX_DECODE_ALLOC: u64 = 64 * 1024 * 1024;

/// A file submitted in the `image` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Client-supplied file name.
    pub file_name: String,
    /// Client-supplied content type.
    pub content_type: Option<String>,
    /// File bytes.
    pub data: Vec<u8>,
}

/// Raw post form submission.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PostForm {
    #[validate(custom(function = "validate_required"))]
    pub text: String,

    /// Group id; empty means no group.
    pub group: String,

    /// Only populated from multipart bodies.
    #[serde(skip)]
    pub image: Option<ImageUpload>,

    #[serde(rename = "image-clear")]
    pub image_clear: Option<String>,
}

/// What a valid submission does to the post's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    /// Leave the current image as is.
    Keep,
    /// Remove the current image.
    Clear,
    /// Store this file and attach it.
    Replace(ImageUpload),
}

/// Values of a post form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPost {
    /// Trimmed text.
    pub text: String,
    /// Existing group id, if any.
    pub group_id: Option<String>,
    /// Image action.
    pub image: ImageChange,
}

impl PostForm {
    /// Initial values for editing `post`.
    #[must_use]
    pub fn from_post(post: &post::Model) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.clone().unwrap_or_default(),
            image: None,
            image_clear: None,
        }
    }

    /// Validate the submission.
    ///
    /// Every field is checked so all messages are reported at once.
    pub async fn clean(&self, groups: &GroupRepository) -> AppResult<Result<CleanedPost, FormErrors>> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };

        let group_id = self.group.trim();
        let group_id = if group_id.is_empty() {
            None
        } else if groups.find_by_id(group_id).await?.is_some() {
            Some(group_id.to_string())
        } else {
            errors.add("group", INVALID_CHOICE_MESSAGE);
            None
        };

        let image = match self.image.as_ref().filter(|upload| !upload.data.is_empty()) {
            Some(upload) => {
                if is_valid_image(&upload.data) {
                    ImageChange::Replace(upload.clone())
                } else {
                    errors.add("image", INVALID_IMAGE_MESSAGE);
                    ImageChange::Keep
                }
            }
            None if self.image_clear.as_deref().is_some_and(is_truthy) => ImageChange::Clear,
            None => ImageChange::Keep,
        };

        Ok(errors.into_result().map(|()| CleanedPost {
            text: self.text.trim().to_string(),
            group_id,
            image,
        }))
    }

    /// Describe the form for rendering.
    ///
    /// `current_image` is the attached image's URL when editing.
    #[must_use]
    pub fn view(
        &self,
        is_bound: bool,
        errors: &FormErrors,
        groups: &[group::Model],
        current_image: Option<String>,
    ) -> FormView {
        let mut choices = vec![Choice {
            value: String::new(),
            label: "---------".to_string(),
        }];
        choices.extend(groups.iter().map(|g| Choice {
            value: g.id.clone(),
            label: g.to_string(),
        }));

        FormView {
            is_bound,
            fields: vec![
                FieldView {
                    name: "text",
                    label: "Text",
                    required: true,
                    help_text: TEXT_HELP,
                    value: Some(self.text.clone()),
                    choices: None,
                    errors: errors.field("text").to_vec(),
                },
                FieldView {
                    name: "group",
                    label: "Group",
                    required: false,
                    help_text: GROUP_HELP,
                    value: Some(self.group.clone()),
                    choices: Some(choices),
                    errors: errors.field("group").to_vec(),
                },
                FieldView {
                    name: "image",
                    label: "Image",
                    required: false,
                    help_text: IMAGE_HELP,
                    value: current_image,
                    choices: None,
                    errors: errors.field("image").to_vec(),
                },
            ],
            errors: errors.clone(),
        }
    }
}

impl CleanedPost {
    /// Bind onto a new post. Id, author and timestamp are left unset.
    #[must_use]
    pub fn into_new(self, image_key: Option<String>) -> post::ActiveModel {
        post::ActiveModel {
            id: NotSet,
            text: Set(self.text),
            author_id: NotSet,
            group_id: Set(self.group_id),
            image: Set(image_key),
            created_at: NotSet,
        }
    }

    /// Bind onto an existing post. Author and timestamp are untouched.
    ///
    /// `image_key` is the stored key for [`ImageChange::Replace`].
    #[must_use]
    pub fn apply_to(self, post: post::Model, image_key: Option<String>) -> post::ActiveModel {
        let mut active = post.into_active_model();
        active.text = Set(self.text);
        active.group_id = Set(self.group_id);
        match self.image {
            ImageChange::Keep => {}
            ImageChange::Clear => active.image = Set(None),
            ImageChange::Replace(_) => active.image = Set(image_key),
        }
        active
    }
}

/// Whether `data` decodes as a supported image.
#[must_use]
pub fn is_valid_image(data: &[u8]) -> bool {
    let Ok(mut reader) = ImageReader::new(Cursor::new(data)).with_guessed_format() else {
        return false;
    };
    if reader.format().is_none() {
        return false;
    }

    let mut limits = Limits::default();
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);

    // Pixel data must decode too; a sound header can front a truncated body.
    reader.decode().is_ok()
}

/// Checkbox semantics: anything but empty or "false".
fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.eq_ignore_ascii_case("false")
}
