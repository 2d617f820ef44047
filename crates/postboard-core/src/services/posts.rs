//! Post and comment mutations.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Comment, Group, NewComment, NewPost, Post, PostChanges};
use crate::error::DomainError;
use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::ports::{CommentRepository, GroupRepository, PostRepository};

/// Result of submitting the post creation form.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Saved(Post),
    Invalid(FormErrors),
}

/// Result of opening or submitting the edit form.
#[derive(Debug, Clone)]
pub enum EditOutcome {
    /// The author may edit; carries the current post.
    Editable(Post),
    Saved(Post),
    Invalid(Post, FormErrors),
    /// Someone other than the author; nothing was changed.
    NotAuthor(Post),
}

/// Result of submitting a comment. Invalid comments are dropped.
#[derive(Debug, Clone)]
pub enum CommentOutcome {
    Created(Comment),
    Discarded(FormErrors),
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    groups: Arc<dyn GroupRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        groups: Arc<dyn GroupRepository>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            posts,
            groups,
            comments,
        }
    }

    /// Groups a post can be filed under.
    pub async fn group_choices(&self) -> Result<Vec<Group>, DomainError> {
        Ok(self.groups.list().await?)
    }

    async fn find_post(&self, post_id: i64) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))
    }

    /// Clean the form and check the selected group exists.
    async fn clean(&self, form: &PostForm) -> Result<Result<PostChanges, FormErrors>, DomainError> {
        let changes = match form.clean() {
            Ok(changes) => changes,
            Err(errors) => return Ok(Err(errors)),
        };

        if let Some(group_id) = changes.group_id {
            if self.groups.find_by_id(group_id).await?.is_none() {
                let mut errors = FormErrors::default();
                errors.add("group", "Select a valid choice.");
                return Ok(Err(errors));
            }
        }

        Ok(Ok(changes))
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        form: &PostForm,
    ) -> Result<SubmitOutcome, DomainError> {
        let changes = match self.clean(form).await? {
            Ok(changes) => changes,
            Err(errors) => return Ok(SubmitOutcome::Invalid(errors)),
        };

        let post = self
            .posts
            .create(
                NewPost::new(author_id, changes.text)
                    .in_group(changes.group_id)
                    .with_image(changes.image),
            )
            .await?;

        tracing::info!(post_id = post.id, %author_id, "Post created");
        Ok(SubmitOutcome::Saved(post))
    }

    /// Load a post for editing by `actor`.
    pub async fn open_edit(&self, actor: Uuid, post_id: i64) -> Result<EditOutcome, DomainError> {
        let post = self.find_post(post_id).await?;
        if post.is_authored_by(actor) {
            Ok(EditOutcome::Editable(post))
        } else {
            Ok(EditOutcome::NotAuthor(post))
        }
    }

    /// Apply an edit. Only the author's edits are persisted.
    pub async fn edit(
        &self,
        actor: Uuid,
        post_id: i64,
        form: &PostForm,
    ) -> Result<EditOutcome, DomainError> {
        let mut post = self.find_post(post_id).await?;

        if !post.is_authored_by(actor) {
            tracing::warn!(post_id, %actor, "Edit attempt by non-author ignored");
            return Ok(EditOutcome::NotAuthor(post));
        }

        let changes = match self.clean(form).await? {
            Ok(changes) => changes,
            Err(errors) => return Ok(EditOutcome::Invalid(post, errors)),
        };

        post.apply(changes);
        let post = self.posts.update(post).await?;
        tracing::info!(post_id, "Post updated");
        Ok(EditOutcome::Saved(post))
    }

    pub async fn add_comment(
        &self,
        author_id: Uuid,
        post_id: i64,
        form: &CommentForm,
    ) -> Result<CommentOutcome, DomainError> {
        let post = self.find_post(post_id).await?;

        let text = match form.clean() {
            Ok(text) => text,
            Err(errors) => {
                tracing::debug!(post_id, %errors, "Discarding invalid comment");
                return Ok(CommentOutcome::Discarded(errors));
            }
        };

        let comment = self
            .comments
            .create(NewComment::new(post.id, author_id, text))
            .await?;
        Ok(CommentOutcome::Created(comment))
    }
}
