//! In-memory repositories - used when no database is configured, and in tests.
//!
//! One store backs every repository trait so that the schema's delete rules
//! (cascade, set-null) hold across entities.

use std::cmp::Reverse;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use postboard_core::domain::{
    Comment, Follow, Group, NewComment, NewFollow, NewGroup, NewPost, Post, User,
};
use postboard_core::error::RepoError;
use postboard_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostFilter,
    PostRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn matching_posts(&self, filter: &PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .iter()
            .filter(|post| match filter {
                PostFilter::All => true,
                PostFilter::Group(id) => post.group_id == Some(*id),
                PostFilter::Author(id) => post.author_id == *id,
                PostFilter::Authors(ids) => ids.contains(&post.author_id),
            })
            .collect();
        posts.sort_by_key(|post| Reverse((post.pub_date, post.id)));
        posts
    }

    fn remove_post(&mut self, id: i64) {
        self.posts.retain(|post| post.id != id);
        self.comments.retain(|comment| comment.post_id != id);
    }
}

/// Process-local store implementing every repository port.
#[derive(Default)]
pub struct InMemoryDatabase {
    tables: RwLock<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(RepoError::Constraint("username already exists".to_string()));
        }
        let slot = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(RepoError::NotFound)?;
        *slot = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Err(RepoError::NotFound);
        }

        let authored: Vec<i64> = tables
            .posts
            .iter()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            tables.remove_post(post_id);
        }
        tables.comments.retain(|c| c.author_id != id);
        tables
            .follows
            .retain(|f| f.user_id != id && f.author_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryDatabase {
    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint("username already exists".to_string()));
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Group, i64> for InMemoryDatabase {
    async fn find_by_id(&self, id: i64) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn update(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .groups
            .iter()
            .any(|g| g.slug == group.slug && g.id != group.id)
        {
            return Err(RepoError::Constraint("slug already exists".to_string()));
        }
        let slot = tables
            .groups
            .iter_mut()
            .find(|g| g.id == group.id)
            .ok_or(RepoError::NotFound)?;
        *slot = group.clone();
        Ok(group)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.groups.len();
        tables.groups.retain(|g| g.id != id);
        if tables.groups.len() == before {
            return Err(RepoError::NotFound);
        }

        for post in tables.posts.iter_mut().filter(|p| p.group_id == Some(id)) {
            post.group_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryDatabase {
    async fn create(&self, group: NewGroup) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.groups.iter().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint("slug already exists".to_string()));
        }
        let group = Group {
            id: tables.next_id(),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .iter()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        let mut groups = tables.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl BaseRepository<Post, i64> for InMemoryDatabase {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .posts
            .iter_mut()
            .find(|p| p.id == post.id)
            .ok_or(RepoError::NotFound)?;
        // Author and publication date are fixed at creation.
        slot.text = post.text;
        slot.group_id = post.group_id;
        slot.image = post.image;
        Ok(slot.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == id) {
            return Err(RepoError::NotFound);
        }
        tables.remove_post(id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryDatabase {
    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == post.author_id) {
            return Err(RepoError::Constraint("author does not exist".to_string()));
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.iter().any(|g| g.id == group_id) {
                return Err(RepoError::Constraint("group does not exist".to_string()));
            }
        }
        let post = Post {
            id: tables.next_id(),
            text: post.text,
            pub_date: post.pub_date,
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.matching_posts(filter).len() as u64)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .matching_posts(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Comment, i64> for InMemoryDatabase {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .comments
            .iter_mut()
            .find(|c| c.id == comment.id)
            .ok_or(RepoError::NotFound)?;
        slot.text = comment.text;
        Ok(slot.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        if tables.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryDatabase {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(RepoError::Constraint("post does not exist".to_string()));
        }
        let comment = Comment {
            id: tables.next_id(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: comment.created,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| Reverse((c.created, c.id)));
        Ok(comments)
    }
}

#[async_trait]
impl FollowRepository for InMemoryDatabase {
    async fn create(&self, follow: NewFollow) -> Result<Follow, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .follows
            .iter()
            .any(|f| f.user_id == follow.user_id && f.author_id == follow.author_id)
        {
            return Err(RepoError::Constraint("already following".to_string()));
        }
        let follow = Follow {
            id: tables.next_id(),
            user_id: follow.user_id,
            author_id: follow.author_id,
        };
        tables.follows.push(follow.clone());
        Ok(follow)
    }

    async fn find_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<Option<Follow>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
            .cloned())
    }

    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<u64, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok((before - tables.follows.len()) as u64)
    }

    async fn followed_author_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.author_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    async fn author(db: &InMemoryDatabase, username: &str) -> User {
        UserRepository::create(
            db,
            User::new(username.to_string(), format!("{username}@example.com"), String::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_listed_newest_first() {
        let db = InMemoryDatabase::new();
        let user = author(&db, "auth").await;
        let now = Utc::now();

        for (i, text) in ["old", "new", "middle"].into_iter().enumerate() {
            let offset = match i {
                0 => -2,
                1 => 0,
                _ => -1,
            };
            PostRepository::create(
                &db,
                NewPost::new(user.id, text).published_at(now + Duration::minutes(offset)),
            )
            .await
            .unwrap();
        }

        let posts = PostRepository::list(&db, &PostFilter::All, 0, 10).await.unwrap();
        let texts: Vec<&str> = posts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, ["new", "middle", "old"]);
    }

    #[tokio::test]
    async fn test_deleting_group_keeps_posts() {
        let db = InMemoryDatabase::new();
        let user = author(&db, "auth").await;
        let group = GroupRepository::create(&db, NewGroup::new("Cats", "cats", ""))
            .await
            .unwrap();
        let post = PostRepository::create(&db, NewPost::new(user.id, "text").in_group(Some(group.id)))
            .await
            .unwrap();

        BaseRepository::<Group, i64>::delete(&db, group.id).await.unwrap();

        let post = BaseRepository::<Post, i64>::find_by_id(&db, post.id)
            .await
            .unwrap()
            .expect("post survives group deletion");
        assert_eq!(post.group_id, None);
    }

    #[tokio::test]
    async fn test_deleting_post_cascades_comments() {
        let db = InMemoryDatabase::new();
        let user = author(&db, "auth").await;
        let post = PostRepository::create(&db, NewPost::new(user.id, "text"))
            .await
            .unwrap();
        CommentRepository::create(&db, NewComment::new(post.id, user.id, "first"))
            .await
            .unwrap();

        BaseRepository::<Post, i64>::delete(&db, post.id).await.unwrap();

        assert!(db.list_for_post(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_follows_and_posts() {
        let db = InMemoryDatabase::new();
        let reader = author(&db, "reader").await;
        let writer = author(&db, "writer").await;
        PostRepository::create(&db, NewPost::new(writer.id, "text"))
            .await
            .unwrap();
        FollowRepository::create(
            &db,
            NewFollow {
                user_id: reader.id,
                author_id: writer.id,
            },
        )
        .await
        .unwrap();

        BaseRepository::<User, Uuid>::delete(&db, writer.id).await.unwrap();

        assert!(db.followed_author_ids(reader.id).await.unwrap().is_empty());
        assert_eq!(PostRepository::count(&db, &PostFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_follow_is_a_constraint_violation() {
        let db = InMemoryDatabase::new();
        let reader = author(&db, "reader").await;
        let writer = author(&db, "writer").await;
        let link = NewFollow {
            user_id: reader.id,
            author_id: writer.id,
        };

        FollowRepository::create(&db, link).await.unwrap();
        let again = FollowRepository::create(&db, link).await;

        assert!(matches!(again, Err(RepoError::Constraint(_))));
        assert_eq!(db.followed_author_ids(reader.id).await.unwrap(), vec![writer.id]);
    }

    #[tokio::test]
    async fn test_post_edit_keeps_author_and_date() {
        let db = InMemoryDatabase::new();
        let user = author(&db, "auth").await;
        let other = author(&db, "vova").await;
        let original = PostRepository::create(&db, NewPost::new(user.id, "before"))
            .await
            .unwrap();

        let mut changed = original.clone();
        changed.text = "after".to_string();
        changed.author_id = other.id;
        changed.pub_date = Utc::now() + Duration::days(1);
        let saved = BaseRepository::<Post, i64>::update(&db, changed).await.unwrap();

        assert_eq!(saved.text, "after");
        assert_eq!(saved.author_id, user.id);
        assert_eq!(saved.pub_date, original.pub_date);
    }

    #[tokio::test]
    async fn test_empty_author_set_selects_nothing() {
        let db = InMemoryDatabase::new();
        let user = author(&db, "auth").await;
        PostRepository::create(&db, NewPost::new(user.id, "text"))
            .await
            .unwrap();

        let filter = PostFilter::Authors(Vec::new());
        assert_eq!(PostRepository::count(&db, &filter).await.unwrap(), 0);
    }
}
