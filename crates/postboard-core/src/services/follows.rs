//! Follow and unfollow.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{NewFollow, User};
use crate::error::{DomainError, RepoError};
use crate::ports::{FollowRepository, UserRepository};

/// Result of a follow request. Every variant redirects back to the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following yourself is ignored.
    SelfFollow,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UserRepository>, follows: Arc<dyn FollowRepository>) -> Self {
        Self { users, follows }
    }

    async fn target(&self, username: &str) -> Result<User, DomainError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("User", username))
    }

    /// Make `user_id` follow `username`.
    pub async fn follow(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<(User, FollowOutcome), DomainError> {
        let author = self.target(username).await?;

        if author.id == user_id {
            return Ok((author, FollowOutcome::SelfFollow));
        }

        if self.follows.find_pair(user_id, author.id).await?.is_some() {
            return Ok((author, FollowOutcome::AlreadyFollowing));
        }

        let outcome = match self
            .follows
            .create(NewFollow {
                user_id,
                author_id: author.id,
            })
            .await
        {
            Ok(_) => FollowOutcome::Created,
            // A concurrent request won the insert.
            Err(RepoError::Constraint(_)) => FollowOutcome::AlreadyFollowing,
            Err(e) => return Err(e.into()),
        };

        tracing::info!(%user_id, author = %author.username, ?outcome, "Follow");
        Ok((author, outcome))
    }

    /// Remove the link from `user_id` to `username` if present.
    pub async fn unfollow(&self, user_id: Uuid, username: &str) -> Result<User, DomainError> {
        let author = self.target(username).await?;
        let removed = self.follows.delete_pair(user_id, author.id).await?;
        tracing::info!(%user_id, author = %author.username, removed, "Unfollow");
        Ok(author)
    }
}
