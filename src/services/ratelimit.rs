use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Fixed-window admission policy: `limit` submissions per `window`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // 20 uploads per 24 hours.
        Self {
            limit: 20,
            window: Duration::from_secs(1440 * 60),
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { limit: u32, remaining: u32 },
}

/// Admission control keyed by caller identity.
///
/// `admit` is infallible: a limiter whose backend is unreachable fails open
/// and admits the request. Availability over strictness.
///
/// Callers without a resolvable identity all share the empty-string bucket,
/// so they throttle as a single pooled caller. Known weak point, preserved
/// as-is pending a product decision.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn admit(&self, identity: &str) -> Admission;
}

/// Redis-backed fixed-window counter.
///
/// One counter key per (identity, window index); the first hit in a window
/// sets an expiry so stale counters clean themselves up.
pub struct RedisRateLimiter {
    client: redis::Client,
    config: RateLimitConfig,
}

impl RedisRateLimiter {
    pub fn new(redis_url: &str, config: RateLimitConfig) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client, config })
    }

    fn window_key(&self, identity: &str) -> String {
        let window_secs = self.config.window.as_secs().max(1);
        let window_index = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            / window_secs;
        format!("dreamwear:ratelimit:{identity}:{window_index}")
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn admit(&self, identity: &str) -> Admission {
        let key = self.window_key(identity);

        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "rate limit backend unavailable, admitting request");
                return Admission::Allowed;
            }
        };

        let count: u64 = match conn.incr(&key, 1u32).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "rate limit counter failed, admitting request");
                return Admission::Allowed;
            }
        };

        if count == 1 {
            // Best-effort expiry; a failure here leaves a counter behind but
            // does not affect this admission decision.
            if let Err(e) = conn
                .expire::<_, ()>(&key, self.config.window.as_secs().max(1) as i64)
                .await
            {
                tracing::warn!(error = %e, "failed to set rate limit window expiry");
            }
        }

        if count > u64::from(self.config.limit) {
            Admission::Denied {
                limit: self.config.limit,
                remaining: 0,
            }
        } else {
            Admission::Allowed
        }
    }
}

/// In-memory fixed-window counter for Redis-less deployments and tests.
pub struct MemoryRateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, WindowBucket>>,
}

struct WindowBucket {
    window_start: Instant,
    count: u32,
}

impl MemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn admit(&self, identity: &str) -> Admission {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        let bucket = buckets
            .entry(identity.to_string())
            .or_insert_with(|| WindowBucket {
                window_start: now,
                count: 0,
            });

        if now.duration_since(bucket.window_start) >= self.config.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        bucket.count += 1;

        if bucket.count > self.config.limit {
            Admission::Denied {
                limit: self.config.limit,
                remaining: 0,
            }
        } else {
            Admission::Allowed
        }
    }
}
