//! Form binding and validation.
//!
//! Forms take raw submitted values, check them, and either yield cleaned
//! values ready to bind onto an entity or a [`FormErrors`] map keyed by field
//! name. Failed validation is a value, not an [`AppError`](quill_common::AppError):
//! the caller re-renders the form with the errors and the submitted input.

pub mod comment;
pub mod post;

pub use comment::CommentForm;
pub use post::{CleanedPost, ImageChange, ImageUpload, PostForm};

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Message for a missing required value.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Message for a reference to something that does not exist.
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Message for an upload that does not decode as an image.
pub const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    /// An empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Whether no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded against `field`.
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Whether `field` has any message.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        !self.field(field).is_empty()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = Self::new();
        for (field, kind) in errors.into_errors() {
            if let ValidationErrorsKind::Field(field_errors) = kind {
                for error in field_errors {
                    let message = error
                        .message
                        .map_or_else(|| error.code.to_string(), Cow::into_owned);
                    form_errors.add(field.to_string(), message);
                }
            }
        }
        form_errors
    }
}

/// Rejects values that are empty once surrounding whitespace is removed.
pub(crate) fn validate_required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED_MESSAGE)));
    }
    Ok(())
}

/// One field as shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    /// Field name as submitted.
    pub name: &'static str,
    /// Human label.
    pub label: &'static str,
    /// Whether the field must be filled.
    pub required: bool,
    /// Guidance shown next to the input.
    pub help_text: &'static str,
    /// Current value (submitted or initial).
    pub value: Option<String>,
    /// Available choices, for select fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    /// Validation messages for this field.
    pub errors: Vec<String>,
}

/// A selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    /// Submitted value.
    pub value: String,
    /// Displayed label.
    pub label: String,
}

/// A form as handed to a template.
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    /// Whether the form holds submitted data.
    pub is_bound: bool,
    /// Fields in display order.
    pub fields: Vec<FieldView>,
    /// All messages keyed by field.
    pub errors: FormErrors,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(custom(function = "validate_required"))]
        text: String,
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(validate_required("").is_err());
        assert!(validate_required("   \n\t").is_err());
        assert!(validate_required(" x ").is_ok());
    }

    #[test]
    fn test_from_validation_errors_uses_message() {
        let probe = Probe {
            text: "  ".to_string(),
        };
        let errors = FormErrors::from(probe.validate().unwrap_err());

        assert_eq!(errors.field("text"), [REQUIRED_MESSAGE.to_string()]);
        assert!(errors.has("text"));
        assert!(!errors.has("group"));
    }

    #[test]
    fn test_into_result() {
        assert!(FormErrors::new().into_result().is_ok());

        let mut errors = FormErrors::new();
        errors.add("image", INVALID_IMAGE_MESSAGE);
        assert!(errors.into_result().is_err());
    }
}
