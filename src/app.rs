// src/app.rs
use crate::auth::magic::{MagicLinkConfig, MagicLinkService};
use crate::config::{Config, RateLimitStoreKind};
use crate::db::Database;
use crate::ratelimit::{FixedWindowLimiter, InMemoryStore, RateLimitStore, SqliteStore};

/// Everything a request handler needs, shared by all worker threads.
pub struct App {
    pub db: Database,
    pub limiter: FixedWindowLimiter,
    pub magic_links: MagicLinkService,
    pub config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        let db = Database::new(config.database_path.clone());

        let store: Box<dyn RateLimitStore> = match config.rate_limit.store {
            RateLimitStoreKind::Memory => Box::new(InMemoryStore::new()),
            RateLimitStoreKind::Sqlite => Box::new(SqliteStore::new(db.clone())),
        };
        let limiter = FixedWindowLimiter::new(
            store,
            config.rate_limit.max_requests,
            config.rate_limit.window_secs,
        );

        let magic_links = MagicLinkService::new(MagicLinkConfig {
            ttl_secs: config.auth.magic_link_ttl_secs,
            magic_path: "/api/auth/magic".to_string(),
            session_ttl_secs: config.auth.session_ttl_secs,
        });

        Self {
            db,
            limiter,
            magic_links,
            config,
        }
    }
}
