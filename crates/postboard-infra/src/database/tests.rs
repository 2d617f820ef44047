#[cfg(test)]
mod tests {
    use crate::database::entity::{group, post};
    use crate::database::postgres_base::map_db_err;
    use crate::database::postgres_repo::{
        PostgresFollowRepository, PostgresGroupRepository, PostgresPostRepository,
    };
    use postboard_core::domain::{Group, Post};
    use postboard_core::error::RepoError;
    use postboard_core::ports::{BaseRepository, FollowRepository, PostFilter, PostRepository};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    fn post_model(id: i64, author_id: uuid::Uuid, text: &str) -> post::Model {
        post::Model {
            id,
            text: text.to_owned(),
            pub_date: chrono::Utc::now().into(),
            author_id,
            group_id: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_find_post_by_id() {
        let author_id = uuid::Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![post_model(7, author_id, "Тестовый пост")]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let result: Option<Post> = repo.find_by_id(7).await.unwrap();

        let post = result.expect("post should be found");
        assert_eq!(post.id, 7);
        assert_eq!(post.text, "Тестовый пост");
        assert_eq!(post.author_id, author_id);
    }

    #[tokio::test]
    async fn test_list_posts_maps_rows() {
        let author_id = uuid::Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![
                post_model(2, author_id, "second"),
                post_model(1, author_id, "first"),
            ]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let posts = repo
            .list(&PostFilter::Author(author_id), 0, 10)
            .await
            .unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].text, "second");
    }

    #[tokio::test]
    async fn test_empty_author_filter_skips_query() {
        // No results are queued: any query would fail.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let repo = PostgresPostRepository::new(db);

        let filter = PostFilter::Authors(Vec::new());
        assert_eq!(repo.count(&filter).await.unwrap(), 0);
        assert!(repo.list(&filter, 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_group_by_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![group::Model {
                id: 1,
                title: "Тестовая группа".to_owned(),
                slug: "test-slug".to_owned(),
                description: "Тестовое описание".to_owned(),
            }]])
            .into_connection();

        let repo = PostgresGroupRepository::new(db);
        let group: Option<Group> = repo.find_by_id(1).await.unwrap();

        assert_eq!(group.map(|g| g.slug), Some("test-slug".to_string()));
    }

    #[tokio::test]
    async fn test_delete_missing_post_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let result = BaseRepository::<Post, i64>::delete(&repo, 42).await;

        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_unfollow_reports_rows_removed() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let repo = PostgresFollowRepository::new(db);
        let removed = repo
            .delete_pair(uuid::Uuid::new_v4(), uuid::Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(removed, 1);
    }

    #[test]
    fn test_map_db_err() {
        assert!(matches!(map_db_err(DbErr::RecordNotUpdated), RepoError::NotFound));
        assert!(matches!(
            map_db_err(DbErr::Custom("boom".to_string())),
            RepoError::Query(_)
        ));
    }
}
