/// Serves a value from the cache, computing and storing it on a miss.
///
/// Cache read failures are logged and treated as misses, so an unavailable
/// Redis never fails the request. Errors from the computing block are
/// propagated with `?`.
///
/// # Arguments
/// * `$cache`: a [`Cache`](crate::db::Cache).
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) to read and write.
/// * `$ttl`: time-to-live for a freshly computed value, in seconds.
/// * `$block`: a future producing `AppResult<T>` on a miss.
///
/// # Example
/// ```rust,ignore
/// let recs: AppResult<Vec<Recommendation>> = cached!(cache, key, 300, async move {
///     compute_recommendations().await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Ok(Some(cached)) => {
                tracing::debug!(key = %$key, "Cache hit");
                Ok(cached)
            }
            other => {
                if let Err(e) = other {
                    tracing::warn!(key = %$key, error = %e, "Cache read failed, computing value");
                } else {
                    tracing::debug!(key = %$key, "Cache miss");
                }
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
