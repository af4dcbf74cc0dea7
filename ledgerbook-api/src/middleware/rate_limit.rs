/// Rate limiting for the session endpoints
///
/// Registration and login are the brute-forceable surface, so they get
/// per-client token buckets:
///
/// - **register**: 5 requests/minute per client
/// - **login**: 10 requests/minute per client
///
/// # Algorithm
///
/// Token bucket: tokens refill at a constant rate, each request consumes
/// one, a request with an empty bucket is rejected with 429 and a
/// `Retry-After` header.
///
/// # Storage
///
/// Buckets live in an in-process map keyed by `{path}:{client}`. The client
/// key is the first `X-Forwarded-For` entry when present (the expected
/// deployment runs behind a proxy), else the peer address. Stale buckets
/// are pruned opportunistically, so the map stays bounded by the set of
/// recently active clients.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Instant;

/// Rate limit rule for one endpoint
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Maximum requests per minute (also the burst capacity)
    pub requests_per_minute: u32,
}

impl RateLimit {
    /// Token refill rate in tokens per second
    fn refill_rate(&self) -> f64 {
        f64::from(self.requests_per_minute) / 60.0
    }
}

/// Limits applied to the session endpoints
const REGISTER_LIMIT: RateLimit = RateLimit {
    requests_per_minute: 5,
};
const LOGIN_LIMIT: RateLimit = RateLimit {
    requests_per_minute: 10,
};

/// How long an untouched bucket is kept before pruning
const BUCKET_IDLE_SECS: u64 = 120;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32) -> Self {
        Self {
            tokens: f64::from(capacity),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, rate: f64, capacity: u32) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * rate).min(f64::from(capacity));
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Seconds until one full token is available again
    fn retry_after(&self, rate: f64) -> u64 {
        ((1.0 - self.tokens) / rate).ceil().max(1.0) as u64
    }
}

/// In-memory rate limiter shared through [`AppState`]
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to take one token for `key` under `limit`
    ///
    /// # Errors
    ///
    /// Returns the suggested `Retry-After` seconds when the bucket is empty.
    pub fn try_acquire(&self, key: &str, limit: RateLimit) -> Result<(), u64> {
        let mut buckets = self.buckets.lock().expect("rate limiter lock poisoned");

        // Opportunistic pruning keeps the map from growing unbounded
        if buckets.len() > 1024 {
            buckets.retain(|_, b| b.last_refill.elapsed().as_secs() < BUCKET_IDLE_SECS);
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(limit.requests_per_minute));

        bucket.refill(limit.refill_rate(), limit.requests_per_minute);

        if bucket.try_consume() {
            Ok(())
        } else {
            Err(bucket.retry_after(limit.refill_rate()))
        }
    }
}

/// Rate limiting middleware for the auth router
///
/// Only register and login are limited; refresh and logout pass through.
pub async fn auth_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path();

    let limit = if path.ends_with("/register") {
        Some(REGISTER_LIMIT)
    } else if path.ends_with("/login") {
        Some(LOGIN_LIMIT)
    } else {
        None
    };

    if let Some(limit) = limit {
        let key = format!("{}:{}", path, client_key(&req));

        if let Err(retry_after) = state.auth_limiter.try_acquire(&key, limit) {
            return Err(ApiError::RateLimitExceeded {
                retry_after,
                message: "Too many requests, slow down".to_string(),
            });
        }
    }

    Ok(next.run(req).await)
}

/// Best-effort client identity for bucketing
fn client_key(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return forwarded.trim().to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
