//! HTTP layer for quill.
//!
//! - **Views**: page handlers producing rendered pages or redirects
//! - **Extractors**: the current user and submitted post forms
//! - **Middleware**: token authentication and the index page cache
//!
//! Pages are rendered as JSON documents naming a template and its context.

pub mod extractors;
pub mod middleware;
pub mod page_cache;
pub mod response;
pub mod views;

pub use middleware::AppState;
pub use page_cache::PageCache;
pub use views::router;
