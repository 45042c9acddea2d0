use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::middleware::{RateLimitStore, RateLimiter};
use crate::repository::{MessageRepository, UserRepository};

/// The shared application state.
///
/// Cheap to clone; every field is a handle onto shared data.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    /// Backing store shared by every limiter below.
    pub rate_limits: RateLimitStore,
    /// The application-wide limiter from `[rate_limit]`.
    pub global_limiter: RateLimiter,
    /// Per-route limiter guarding user creation.
    pub user_create_limiter: RateLimiter,
    pub users: UserRepository,
    pub messages: MessageRepository,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        Self::with_rate_limit_store(db, config, RateLimitStore::new())
    }

    /// Builds the state around an existing store, e.g. one driven by a manual clock.
    pub fn with_rate_limit_store(db: sqlx::SqlitePool, config: AppConfig, rate_limits: RateLimitStore) -> Self {
        let trust_proxy = config.server.trust_proxy;
        let global_limiter = RateLimiter::from_config(rate_limits.clone(), &config.rate_limit, trust_proxy);
        let user_create = config.rate_limit.user_create;
        let user_create_limiter =
            RateLimiter::custom(rate_limits.clone(), user_create.max_requests, user_create.window_ms)
                .with_scope("user_create")
                .with_trust_proxy(trust_proxy);

        Self {
            users: UserRepository::new(db.clone()),
            messages: MessageRepository::new(db.clone()),
            db,
            config: Arc::new(config),
            rate_limits,
            global_limiter,
            user_create_limiter,
            started_at: Instant::now(),
        }
    }
}
