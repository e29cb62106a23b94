//! Common utilities and shared types for quill.
//!
//! This crate provides foundational components used across all quill crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based identifiers and access tokens via [`IdGenerator`]
//! - **Pagination**: Page-number slicing via [`Paginator`]
//! - **Storage**: File storage backends for uploaded images
//!
//! # Example
//!
//! ```no_run
//! use quill_common::{AppResult, Config, Paginator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let paginator = Paginator::new(config.pagination.posts_per_page);
//!     let window = paginator.window(Some("2"), 13);
//!     println!("page {} of {}", window.number, window.num_pages);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod pagination;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use pagination::{DEFAULT_PAGE_SIZE, Page, PageWindow, Paginator};
pub use storage::{LocalStorage, StorageBackend, UploadedFile, sanitize_file_name, with_suffix};
