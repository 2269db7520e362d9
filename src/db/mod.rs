pub mod redis;
pub mod sqlite;

pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
pub use sqlite::{create_pool, migrate, seed_sample_books};
