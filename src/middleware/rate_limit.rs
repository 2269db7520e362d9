use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{AppError, AppResult};

const PRUNE_THRESHOLD: usize = 10_000;

/// Allow at most `max_requests` per `period`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub max_requests: u32,
    pub period: Duration,
}

impl Quota {
    pub fn per_hour(max_requests: u32) -> Self {
        Self {
            max_requests,
            period: Duration::from_secs(60 * 60),
        }
    }

    pub fn per_day(max_requests: u32) -> Self {
        Self {
            max_requests,
            period: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window limiter keyed by client. Every quota must have room for a
/// request to pass; rejected requests do not consume any quota. A quota
/// with `max_requests == 0` is treated as unlimited.
#[derive(Clone)]
pub struct RateLimiter {
    quotas: Arc<Vec<Quota>>,
    windows: Arc<Mutex<HashMap<(String, usize), Window>>>,
}

impl RateLimiter {
    pub fn new(quotas: Vec<Quota>) -> Self {
        let quotas = quotas.into_iter().filter(|q| q.max_requests > 0).collect();
        Self {
            quotas: Arc::new(quotas),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    /// Records a request at `now`, or returns how long until it would be allowed
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        if self.quotas.is_empty() {
            return Ok(());
        }

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() > PRUNE_THRESHOLD {
            let quotas = &self.quotas;
            windows.retain(|(_, idx), w| now.duration_since(w.started) < quotas[*idx].period);
        }

        let mut retry_after: Option<Duration> = None;
        for (idx, quota) in self.quotas.iter().enumerate() {
            let window = windows
                .entry((key.to_string(), idx))
                .or_insert(Window {
                    started: now,
                    count: 0,
                });

            let elapsed = now.duration_since(window.started);
            if elapsed >= quota.period {
                *window = Window {
                    started: now,
                    count: 0,
                };
            } else if window.count >= quota.max_requests {
                let wait = quota.period - elapsed;
                retry_after = Some(retry_after.map_or(wait, |w| w.max(wait)));
            }
        }

        if let Some(wait) = retry_after {
            return Err(wait);
        }

        for idx in 0..self.quotas.len() {
            if let Some(window) = windows.get_mut(&(key.to_string(), idx)) {
                window.count += 1;
            }
        }

        Ok(())
    }
}

/// Client key for rate limiting: the peer IP when the server was started
/// with connect info, otherwise a shared bucket
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting requests over the limiter's quotas with 429
pub async fn enforce(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let key = client_key(&request);

    if let Err(wait) = limiter.check(&key) {
        let retry_after_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        tracing::warn!(
            client = %key,
            path = %request.uri().path(),
            retry_after_secs,
            "Rate limit exceeded"
        );
        return Err(AppError::RateLimited { retry_after_secs });
    }

    Ok(next.run(request).await)
}
