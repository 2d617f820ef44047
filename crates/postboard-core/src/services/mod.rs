//! Application services: the feed queries and mutations behind each route.

mod accounts;
mod feed;
mod follows;
mod fragment;
mod posts;

pub use accounts::{AccountService, SignupOutcome};
pub use feed::{CommentEntry, FeedService, PostDetail, ProfileView};
pub use follows::{FollowOutcome, FollowService};
pub use fragment::{FragmentCache, INDEX_PAGE_FRAGMENT};
pub use posts::{CommentOutcome, EditOutcome, PostService, SubmitOutcome};
