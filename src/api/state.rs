use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    config::Config,
    db::{Cache, CacheKey},
    middleware::{Quota, RateLimiter},
    services::RecommendationSettings,
};

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// Present only when a Redis URL is configured
    pub cache: Option<Cache>,
    pub config: Arc<Config>,
    /// Applies to every request
    pub rate_limiter: RateLimiter,
    /// Applies to account registration only
    pub register_limiter: RateLimiter,
    pub recommendation_settings: Arc<RecommendationSettings>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, cache: Option<Cache>) -> Self {
        let rate_limiter = RateLimiter::new(vec![
            Quota::per_hour(config.rate_limit_per_hour),
            Quota::per_day(config.rate_limit_per_day),
        ]);
        let register_limiter = RateLimiter::new(vec![Quota::per_hour(config.register_limit_per_hour)]);

        Self {
            pool,
            cache,
            config: Arc::new(config),
            rate_limiter,
            register_limiter,
            recommendation_settings: Arc::new(RecommendationSettings::default()),
        }
    }

    /// Retires a user's cached recommendations after their inputs changed
    ///
    /// Call after the database write has committed.
    pub async fn invalidate_recommendations(&self, user_id: i64) {
        self.bump_generation(CacheKey::UserGeneration(user_id)).await;
    }

    /// Retires every user's cached recommendations after book data changed
    pub async fn invalidate_all_recommendations(&self) {
        self.bump_generation(CacheKey::CatalogGeneration).await;
    }

    async fn bump_generation(&self, key: CacheKey) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.bump_generation(&key).await {
                tracing::warn!(key = %key, error = %e, "Failed to invalidate cached recommendations");
            }
        }
    }
}
