use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Group, User, preview};

/// Post entity. Feeds list posts newest first by `pub_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub text: String,
    /// Set once on creation, never touched by edits.
    pub pub_date: DateTime<Utc>,
    pub author_id: Uuid,
    /// Cleared when the group is deleted.
    pub group_id: Option<i64>,
    /// Path relative to the media root, e.g. `posts/cat.png`.
    pub image: Option<String>,
}

/// Input for creating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: Uuid,
    pub group_id: Option<i64>,
    pub image: Option<String>,
    pub pub_date: DateTime<Utc>,
}

impl NewPost {
    pub fn new(author_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author_id,
            group_id: None,
            image: None,
            pub_date: Utc::now(),
        }
    }

    pub fn in_group(mut self, group_id: Option<i64>) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    /// Override the publication time (fixtures and imports).
    pub fn published_at(mut self, pub_date: DateTime<Utc>) -> Self {
        self.pub_date = pub_date;
        self
    }
}

/// Fields an author may change on an existing post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl Post {
    pub fn apply(&mut self, changes: PostChanges) {
        self.text = changes.text;
        self.group_id = changes.group_id;
        self.image = changes.image;
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&preview(&self.text))
    }
}

/// A post together with the author and group it links to, as shown in feeds.
#[derive(Debug, Clone, Serialize)]
pub struct PostEntry {
    #[serde(flatten)]
    pub post: Post,
    pub author: User,
    pub group: Option<Group>,
}
