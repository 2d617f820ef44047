//! Application state - shared across all handlers.

use std::sync::Arc;

use postboard_core::ports::{
    Cache, CommentRepository, FollowRepository, GroupRepository, PasswordService,
    PostRepository, TokenService, UserRepository,
};
use postboard_core::services::{
    AccountService, FeedService, FollowService, FragmentCache, PostService,
};
use postboard_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryDatabase, JwtConfig, JwtTokenService,
};

#[cfg(feature = "postgres")]
use postboard_infra::database::{
    PostgresCommentRepository, PostgresFollowRepository, PostgresGroupRepository,
    PostgresPostRepository, PostgresUserRepository,
};

use crate::config::{AppConfig, SiteConfig};

/// One implementation per repository port.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
}

impl Repositories {
    /// Every port backed by one process-local store.
    pub fn in_memory() -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        Self {
            users: db.clone(),
            groups: db.clone(),
            posts: db.clone(),
            comments: db.clone(),
            follows: db,
        }
    }

    #[cfg(feature = "postgres")]
    pub fn postgres(conn: sea_orm::DbConn) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(conn.clone())),
            groups: Arc::new(PostgresGroupRepository::new(conn.clone())),
            posts: Arc::new(PostgresPostRepository::new(conn.clone())),
            comments: Arc::new(PostgresCommentRepository::new(conn.clone())),
            follows: Arc::new(PostgresFollowRepository::new(conn)),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub feed: FeedService,
    pub posts: PostService,
    pub follows: FollowService,
    pub accounts: AccountService,
    pub fragments: FragmentCache,
    pub site: SiteConfig,
}

impl AppState {
    /// Wire services over the given backends.
    pub fn assemble(
        repos: Repositories,
        cache: Arc<dyn Cache>,
        jwt: JwtConfig,
        site: SiteConfig,
    ) -> Self {
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(jwt));
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

        Self {
            feed: FeedService::new(
                repos.posts.clone(),
                repos.users.clone(),
                repos.groups.clone(),
                repos.comments.clone(),
                repos.follows.clone(),
            ),
            posts: PostService::new(
                repos.posts.clone(),
                repos.groups.clone(),
                repos.comments.clone(),
            ),
            follows: FollowService::new(repos.users.clone(), repos.follows.clone()),
            accounts: AccountService::new(repos.users.clone(), passwords),
            fragments: FragmentCache::new(cache, site.index_cache_ttl),
            users: repos.users,
            tokens,
            site,
        }
    }

    /// In-memory repositories and cache.
    pub fn in_memory(jwt: JwtConfig, site: SiteConfig) -> Self {
        Self::assemble(
            Repositories::in_memory(),
            Arc::new(InMemoryCache::new()),
            jwt,
            site,
        )
    }

    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let cache = Self::init_cache(config).await;
        let repos = Self::init_repositories(config).await;

        tracing::info!(
            posts_per_page = config.site.posts_per_page,
            index_cache_secs = config.site.index_cache_ttl.as_secs(),
            "Application state initialized"
        );

        Self::assemble(repos, cache, config.jwt.clone(), config.site.clone())
    }

    #[cfg(feature = "redis")]
    async fn init_cache(config: &AppConfig) -> Arc<dyn Cache> {
        use postboard_infra::RedisCache;

        if let Some(redis) = &config.redis {
            match RedisCache::new(redis.clone()).await {
                Ok(cache) => return Arc::new(cache),
                Err(e) => {
                    tracing::error!("Failed to connect to Redis: {}. Using in-memory cache.", e)
                }
            }
        }
        Arc::new(InMemoryCache::new())
    }

    #[cfg(not(feature = "redis"))]
    async fn init_cache(_config: &AppConfig) -> Arc<dyn Cache> {
        Arc::new(InMemoryCache::new())
    }

    #[cfg(feature = "postgres")]
    async fn init_repositories(config: &AppConfig) -> Repositories {
        use migration::{Migrator, MigratorTrait};

        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Repositories::in_memory();
        };

        let conn = match postboard_infra::database::connect(db_config).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                return Repositories::in_memory();
            }
        };

        if let Err(e) = Migrator::up(&conn, None).await {
            tracing::error!("Failed to apply migrations: {}. Using in-memory fallback.", e);
            return Repositories::in_memory();
        }

        Repositories::postgres(conn)
    }

    #[cfg(not(feature = "postgres"))]
    async fn init_repositories(_config: &AppConfig) -> Repositories {
        tracing::info!("Running without postgres feature - using in-memory repositories");
        Repositories::in_memory()
    }
}
