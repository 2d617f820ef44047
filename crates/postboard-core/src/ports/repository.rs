use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Comment, Follow, Group, NewComment, NewFollow, NewGroup, NewPost, Post, User,
};
use crate::error::RepoError;

/// Operations shared by every entity repository.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Persist changes to an existing entity.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID. Dependent rows follow the schema's
    /// cascade / set-null rules.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Insert a new user. Fails with `Constraint` if the username is taken.
    async fn create(&self, user: User) -> Result<User, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Group repository.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, i64> {
    async fn create(&self, group: NewGroup) -> Result<Group, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Group>, RepoError>;

    /// All groups ordered by title, for form choices.
    async fn list(&self) -> Result<Vec<Group>, RepoError>;
}

/// Which posts a feed selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(Uuid),
    /// Posts by any of these authors. An empty set selects nothing.
    Authors(Vec<Uuid>),
}

/// Post repository. Listings are ordered newest first.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, i64> {
    async fn create(&self, post: NewPost) -> Result<Post, RepoError>;

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError>;

    async fn list(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, i64> {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError>;

    /// Comments on a post, newest first.
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError>;
}

/// Follow link repository.
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Insert a link. Fails with `Constraint` when the pair already exists
    /// on backends that enforce uniqueness.
    async fn create(&self, follow: NewFollow) -> Result<Follow, RepoError>;

    async fn find_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<Option<Follow>, RepoError>;

    /// Remove every link from `user_id` to `author_id`; returns rows removed.
    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError>;

    /// Authors `user_id` currently follows.
    async fn followed_author_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError>;
}
