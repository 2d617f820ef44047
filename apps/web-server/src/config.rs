//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use postboard_core::pagination::DEFAULT_PAGE_SIZE;
use postboard_infra::JwtConfig;
use postboard_infra::database::DatabaseConfig;

#[cfg(feature = "redis")]
use postboard_infra::RedisConfig;

/// Where guests are sent when a route needs a login.
pub const DEFAULT_LOGIN_URL: &str = "/auth/login/";

/// Seconds a rendered index page is served from the fragment cache.
pub const DEFAULT_INDEX_CACHE_SECONDS: u64 = 20;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub site: SiteConfig,
}

/// Settings the handlers read at request time.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub posts_per_page: u64,
    pub index_cache_ttl: Duration,
    pub login_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            posts_per_page: DEFAULT_PAGE_SIZE,
            index_cache_ttl: Duration::from_secs(DEFAULT_INDEX_CACHE_SECONDS),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| {
            let defaults = DatabaseConfig::new(url);
            DatabaseConfig {
                max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
                min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
                sqlx_logging: env_or("DB_SQLX_LOGGING", defaults.sqlx_logging),
                ..defaults
            }
        });

        let defaults = SiteConfig::default();
        let site = SiteConfig {
            posts_per_page: env_or("POSTS_PER_PAGE", defaults.posts_per_page).max(1),
            index_cache_ttl: Duration::from_secs(env_or(
                "INDEX_CACHE_SECONDS",
                DEFAULT_INDEX_CACHE_SECONDS,
            )),
            login_url: env::var("LOGIN_URL").unwrap_or(defaults.login_url),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 8080),
            database,
            #[cfg(feature = "redis")]
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            site,
        }
    }
}
