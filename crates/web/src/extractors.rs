//! Request extractors.

use axum::{
    Form,
    extract::{
        FromRef, FromRequest, FromRequestParts, Multipart, OriginalUri, Request,
        rejection::FormRejection,
    },
    http::{header::CONTENT_TYPE, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use quill_common::AppError;
use quill_core::{ImageUpload, PostForm};
use quill_db::entities::user;

use crate::middleware::AppState;

/// Authenticated user extractor.
///
/// Anonymous requests are redirected to the login page, which is told where
/// to send the user back.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

/// Redirect to the login page carrying the requested location.
#[derive(Debug)]
pub struct LoginRedirect(String);

impl LoginRedirect {
    /// Build the redirect for a request to `path_and_query`.
    #[must_use]
    pub fn new(login_url: &str, path_and_query: &str) -> Self {
        let next = urlencoding::encode(path_and_query).replace("%2F", "/");
        Self(format!("{login_url}?next={next}"))
    }

    /// The login URL with its `next` parameter.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.0
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to(self.location()).into_response()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Get user from request extensions (set by auth middleware)
        if let Some(user) = parts.extensions.get::<user::Model>() {
            return Ok(Self(user.clone()));
        }

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let path_and_query = uri
            .path_and_query()
            .map_or_else(|| uri.path(), |pq| pq.as_str());

        let app = AppState::from_ref(state);
        Err(LoginRedirect::new(&app.login_url, path_and_query))
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// A submitted post form, from a urlencoded or multipart body.
///
/// Only multipart bodies can carry an image.
#[derive(Debug, Clone)]
pub struct PostSubmission(pub PostForm);

impl<S> FromRequest<S> for PostSubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            return match Form::<PostForm>::from_request(req, state).await {
                Ok(Form(form)) => Ok(Self(form)),
                // A bodiless submission is an empty form, not a bad request.
                Err(FormRejection::InvalidFormContentType(_)) => Ok(Self(PostForm::default())),
                Err(e) => Err(AppError::BadRequest(e.body_text())),
            };
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut form = PostForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();

            match name.as_str() {
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(std::string::ToString::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?
                        .to_vec();
                    form.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        data,
                    });
                }
                "text" | "group" | "image-clear" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    match name.as_str() {
                        "text" => form.text = text,
                        "group" => form.group = text,
                        _ => form.image_clear = Some(text),
                    }
                }
                _ => {}
            }
        }

        Ok(Self(form))
    }
}
