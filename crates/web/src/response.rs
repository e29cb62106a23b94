//! Rendered page responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

/// A template name with the context it is rendered with.
#[derive(Debug, Serialize)]
pub struct Rendered<C: Serialize> {
    pub template: &'static str,
    pub context: C,
}

impl<C: Serialize> Rendered<C> {
    /// Render `template` with `context`.
    pub const fn new(template: &'static str, context: C) -> Self {
        Self { template, context }
    }
}

impl<C: Serialize> IntoResponse for Rendered<C> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Profile page URL for `username`.
#[must_use]
pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

/// Detail page URL for a post.
#[must_use]
pub fn post_url(post_id: &str) -> String {
    format!("/posts/{}/", urlencoding::encode(post_id))
}

/// Redirect to a user's profile.
#[must_use]
pub fn to_profile(username: &str) -> Redirect {
    Redirect::to(&profile_url(username))
}

/// Redirect to a post's detail page.
#[must_use]
pub fn to_post(post_id: &str) -> Redirect {
    Redirect::to(&post_url(post_id))
}
