//! Domain entities - the core business objects.

mod comment;
mod follow;
mod group;
mod post;
mod user;

pub use comment::{Comment, NewComment};
pub use follow::{Follow, NewFollow};
pub use group::{Group, NewGroup};
pub use post::{NewPost, Post, PostChanges, PostEntry};
pub use user::User;

/// Number of characters shown by the short string form of posts and comments.
pub const PREVIEW_CHARS: usize = 15;

pub(crate) fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
