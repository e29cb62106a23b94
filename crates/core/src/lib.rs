//! Core business logic for quill.
//!
//! - [`forms`] binds and validates submitted post and comment input
//! - [`services`] combines repositories, forms and storage into the
//!   operations the web layer exposes

pub mod forms;
pub mod services;

pub use forms::{CommentForm, FormErrors, ImageChange, ImageUpload, PostForm};
pub use services::*;
