//! Business logic services.

pub mod comment;
pub mod follow;
pub mod group;
pub mod media;
pub mod post;
pub mod user;

pub use comment::{CommentService, CommentView};
pub use follow::FollowService;
pub use group::{CreateGroupInput, GroupService};
pub use media::MediaService;
pub use post::{EditAccess, PostService, PostView};
pub use user::{RegisterUserInput, UserService};
