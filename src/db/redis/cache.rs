use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Computed recommendations for a user, scoped to the catalog and user
    /// generations they were computed under
    Recommendations {
        user_id: i64,
        catalog: u64,
        user: u64,
    },
    /// Counter bumped whenever a user's ratings or preferences change
    UserGeneration(i64),
    /// Counter bumped whenever book data changes
    CatalogGeneration,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations {
                user_id,
                catalog,
                user,
            } => write!(f, "bookwise:recs:{}:{}:{}", user_id, catalog, user),
            CacheKey::UserGeneration(user_id) => write!(f, "bookwise:recs_gen:{}", user_id),
            CacheKey::CatalogGeneration => write!(f, "bookwise:catalog_gen"),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
enum CacheWriteMessage {
    Set { key: String, value: String, ttl: u64 },
}

/// Cache handler for storing and retrieving data from Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task, which flushes pending
    /// writes before exiting.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// Writes are queued to a background task so they never block API
    /// responses.
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Background task that applies queued cache writes in order
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::apply(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    // Senders live in cloned Cache handles, so drain what is
                    // queued right now instead of waiting for the channel to close.
                    while let Ok(msg) = write_rx.try_recv() {
                        if let Err(e) = Self::apply(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Applies a single message to Redis
    async fn apply(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        match msg {
            CacheWriteMessage::Set { key, value, ttl } => {
                let _: () = conn.set_ex(key, value, ttl).await?;
            }
        }
        Ok(())
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` when the key is absent.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(format!("{}", key)).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Queues a value to be stored with the given TTL in seconds
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        self.send(CacheWriteMessage::Set {
            key: format!("{}", key),
            value: json,
            ttl,
        });
    }

    /// Builds the recommendations key for the current generations
    ///
    /// Read this before computing: a write queued under an older generation
    /// lands on a key no reader asks for again.
    pub async fn recommendations_key(&self, user_id: i64) -> AppResult<CacheKey> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let (catalog, user): (Option<u64>, Option<u64>) = redis::cmd("MGET")
            .arg(CacheKey::CatalogGeneration.to_string())
            .arg(CacheKey::UserGeneration(user_id).to_string())
            .query_async(&mut conn)
            .await?;

        Ok(CacheKey::Recommendations {
            user_id,
            catalog: catalog.unwrap_or(0),
            user: user.unwrap_or(0),
        })
    }

    /// Advances a generation counter, orphaning entries keyed on the old value
    pub async fn bump_generation(&self, key: &CacheKey) -> AppResult<u64> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let generation: u64 = conn.incr(key.to_string(), 1).await?;
        tracing::debug!(key = %key, generation, "Cache generation bumped");
        Ok(generation)
    }

    fn send(&self, msg: CacheWriteMessage) {
        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}
