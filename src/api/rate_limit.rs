//! Per-client fixed-window request limits, held in process memory.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::ApiError;

/// Windows are swept once the map grows past this many entries.
const SWEEP_THRESHOLD: usize = 10_000;

/// Longest window any limit uses.
const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
pub struct Limit {
    pub bucket: &'static str,
    pub max_requests: u32,
    pub window: Duration,
}

impl Limit {
    #[must_use]
    pub const fn per_hour(bucket: &'static str, max_requests: u32) -> Self {
        Self {
            bucket,
            max_requests,
            window: Duration::from_secs(60 * 60),
        }
    }

    #[must_use]
    pub const fn per_day(bucket: &'static str, max_requests: u32) -> Self {
        Self {
            bucket,
            max_requests,
            window: MAX_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    windows: Mutex<HashMap<(&'static str, String), Window>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a request from `client` and reports whether it is admitted.
    pub fn check(&self, limit: Limit, client: &str, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }

        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < MAX_WINDOW);
        }

        let window = windows
            .entry((limit.bucket, client.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now.duration_since(window.started) >= limit.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        if window.count >= limit.max_requests {
            return false;
        }

        window.count += 1;
        true
    }
}

/// Middleware state pairing the shared limiter with one limit.
#[derive(Clone)]
pub struct RateLimited {
    limiter: Arc<RateLimiter>,
    limit: Limit,
}

impl RateLimited {
    #[must_use]
    pub fn new(limiter: &Arc<RateLimiter>, limit: Limit) -> Self {
        Self {
            limiter: limiter.clone(),
            limit,
        }
    }
}

pub async fn enforce(State(limited): State<RateLimited>, request: Request, next: Next) -> Response {
    let client = client_key(&request);

    if limited
        .limiter
        .check(limited.limit, &client, Instant::now())
    {
        return next.run(request).await;
    }

    tracing::warn!(
        bucket = limited.limit.bucket,
        client = %client,
        "Rate limit exceeded"
    );
    ApiError::TooManyRequests.into_response()
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}
