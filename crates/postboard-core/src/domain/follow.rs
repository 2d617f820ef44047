use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directed follow link: `user_id` wants `author_id`'s posts in their feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: i64,
    pub user_id: Uuid,
    pub author_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct NewFollow {
    pub user_id: Uuid,
    pub author_id: Uuid,
}
