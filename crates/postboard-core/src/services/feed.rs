//! Read-side feeds: index, group, profile, post detail and the follow feed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Comment, Group, Post, PostEntry, User};
use crate::error::DomainError;
use crate::pagination::{Page, PageRequest};
use crate::ports::{
    CommentRepository, FollowRepository, GroupRepository, PostFilter, PostRepository,
    UserRepository,
};

/// An author's page.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub author: User,
    pub post_count: u64,
    /// Whether the viewer follows this author. Always false for guests.
    pub following: bool,
    pub page: Page<PostEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentEntry {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: User,
}

/// A single post with its comments.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: PostEntry,
    /// Number of posts by the same author.
    pub author_post_count: u64,
    pub comments: Vec<CommentEntry>,
}

/// Builds every paginated feed.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    comments: Arc<dyn CommentRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
        comments: Arc<dyn CommentRepository>,
        follows: Arc<dyn FollowRepository>,
    ) -> Self {
        Self {
            posts,
            users,
            groups,
            comments,
            follows,
        }
    }

    /// All posts.
    pub async fn index(&self, request: PageRequest) -> Result<Page<PostEntry>, DomainError> {
        self.page(&PostFilter::All, request).await
    }

    /// Number of the index page `request` lands on after clamping.
    pub async fn index_page_number(&self, request: PageRequest) -> Result<u64, DomainError> {
        let total = self.posts.count(&PostFilter::All).await?;
        Ok(request.resolve(total).number)
    }

    /// Posts filed under the group with `slug`.
    pub async fn group(
        &self,
        slug: &str,
        request: PageRequest,
    ) -> Result<(Group, Page<PostEntry>), DomainError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Group", slug))?;

        let page = self.page(&PostFilter::Group(group.id), request).await?;
        Ok((group, page))
    }

    /// Posts by `username`, plus whether `viewer` follows them.
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        request: PageRequest,
    ) -> Result<ProfileView, DomainError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("User", username))?;

        let page = self.page(&PostFilter::Author(author.id), request).await?;

        let following = match viewer {
            Some(viewer_id) => self
                .follows
                .find_pair(viewer_id, author.id)
                .await?
                .is_some(),
            None => false,
        };

        Ok(ProfileView {
            post_count: page.total_count,
            following,
            author,
            page,
        })
    }

    pub async fn post_detail(&self, post_id: i64) -> Result<PostDetail, DomainError> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))?;

        let author_post_count = self.posts.count(&PostFilter::Author(post.author_id)).await?;

        let comments = self.comments.list_for_post(post.id).await?;
        let author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
        let authors = self.users_by_id(&author_ids).await?;
        let comments = comments
            .into_iter()
            .filter_map(|comment| {
                let author = authors.get(&comment.author_id)?.clone();
                Some(CommentEntry { comment, author })
            })
            .collect();

        let post = self
            .hydrate(vec![post])
            .await?
            .pop()
            .ok_or_else(|| DomainError::Internal(format!("post {post_id} has no author")))?;

        Ok(PostDetail {
            post,
            author_post_count,
            comments,
        })
    }

    /// Posts by every author `user_id` follows at the time of the call.
    pub async fn follow_feed(
        &self,
        user_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<PostEntry>, DomainError> {
        let authors = self.follows.followed_author_ids(user_id).await?;
        tracing::debug!(%user_id, authors = authors.len(), "Building follow feed");
        self.page(&PostFilter::Authors(authors), request).await
    }

    async fn page(
        &self,
        filter: &PostFilter,
        request: PageRequest,
    ) -> Result<Page<PostEntry>, DomainError> {
        let total = self.posts.count(filter).await?;
        let window = request.resolve(total);
        let posts = self.posts.list(filter, window.offset, window.limit).await?;
        let entries = self.hydrate(posts).await?;
        Ok(Page::new(entries, window, total))
    }

    /// Attach authors and groups to posts, keeping order.
    async fn hydrate(&self, posts: Vec<Post>) -> Result<Vec<PostEntry>, DomainError> {
        let author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        let group_ids: Vec<i64> = posts.iter().filter_map(|p| p.group_id).collect();

        let authors = self.users_by_id(&author_ids).await?;
        let groups: HashMap<i64, Group> = if group_ids.is_empty() {
            HashMap::new()
        } else {
            self.groups
                .find_by_ids(&dedup(group_ids))
                .await?
                .into_iter()
                .map(|g| (g.id, g))
                .collect()
        };

        Ok(posts
            .into_iter()
            .filter_map(|post| {
                let Some(author) = authors.get(&post.author_id).cloned() else {
                    tracing::warn!(post_id = post.id, "Skipping post with missing author");
                    return None;
                };
                let group = post.group_id.and_then(|id| groups.get(&id).cloned());
                Some(PostEntry {
                    post,
                    author,
                    group,
                })
            })
            .collect())
    }

    async fn users_by_id(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>, DomainError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .users
            .find_by_ids(&dedup(ids.to_vec()))
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }
}

fn dedup<T: Ord>(mut ids: Vec<T>) -> Vec<T> {
    ids.sort();
    ids.dedup();
    ids
}
