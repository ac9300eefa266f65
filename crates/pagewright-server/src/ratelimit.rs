// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-client rate limiting for the conversion endpoint.
//
// A keyed token bucket (`governor`) per client IP. Clients over the quota get
// 429 with a Retry-After hint; nobody is ever banned. The client IP comes from
// the connection (`ConnectInfo`) only; forwarded headers are not trusted.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use pagewright_core::RateLimitConfig;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Option<Arc<DefaultKeyedRateLimiter<IpAddr>>>,
}

impl RateLimitState {
    /// Build from config; a disabled or zero-sized quota yields a no-op limiter.
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        match quota(config) {
            Some(quota) => Self {
                inner: Some(Arc::new(RateLimiter::keyed(quota))),
            },
            None => {
                warn!(?config, "rate limit quota is empty, limiting disabled");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Take one token for `ip`.
    pub fn check(&self, ip: IpAddr) -> Result<(), ApiError> {
        let Some(limiter) = &self.inner else {
            return Ok(());
        };
        limiter.check_key(&ip).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            debug!(%ip, wait_ms = wait.as_millis() as u64, "client rate limited");
            ApiError::RateLimited {
                retry_after_secs: wait.as_secs() + 1,
            }
        })
    }

    /// Drop buckets that have refilled completely.
    pub fn cleanup(&self) {
        if let Some(limiter) = &self.inner {
            limiter.retain_recent();
            limiter.shrink_to_fit();
            debug!(tracked_clients = limiter.len(), "rate limiter cleanup");
        }
    }
}

/// `requests_per_window` tokens per `window_secs`, all available as a burst.
fn quota(config: &RateLimitConfig) -> Option<Quota> {
    let burst = NonZeroU32::new(config.requests_per_window)?;
    let period = Duration::from_secs(config.window_secs) / burst.get();
    Quota::with_period(period).map(|quota| quota.allow_burst(burst))
}

/// Client address from the connection; requests served without
/// `ConnectInfo` (tests, in-process callers) share one bucket.
fn client_ip(req: &Request<Body>) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Per-IP rate limiting middleware.
pub async fn ip_rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !rate_limit.is_enabled() {
        return next.run(req).await;
    }

    match rate_limit.check(client_ip(&req)) {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

/// Spawn a background task that periodically drops idle buckets.
pub fn spawn_cleanup_task(state: RateLimitState, interval: Duration) -> Option<JoinHandle<()>> {
    if !state.is_enabled() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.cleanup();
        }
    }))
}
