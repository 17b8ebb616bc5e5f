//! Fixed-window rate limiting per client address.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::http::error::ApiError;
use crate::observability::metrics;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Counter for one client within the current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window resets.
    pub reset_after: Duration,
}

/// Shared limiter state, owned by the server and injected into the middleware.
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
        }
    }

    /// Count a request from `client` at the current instant.
    pub fn check(&self, client: IpAddr) -> Decision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Decision {
        let mut entry = self
            .windows
            .entry(client)
            .or_insert(Window { started: now, hits: 0 });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, hits: 0 };
        }

        let allowed = entry.hits < self.max_requests;
        if allowed {
            entry.hits += 1;
        }

        Decision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.hits),
            reset_after: self.window.saturating_sub(now.duration_since(entry.started)),
        }
    }

    /// Drop windows that have already expired.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        // Counted inside `retain`: clients may be inserted while it runs.
        let mut evicted = 0;
        self.windows.retain(|_, w| {
            let live = now.saturating_duration_since(w.started) < self.window;
            evicted += usize::from(!live);
            live
        });
        evicted
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Sweep expired windows once per window length until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.window);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.sweep();
                    if evicted > 0 {
                        tracing::debug!(evicted, tracked = self.tracked_clients(), "Swept rate limit windows");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    }
}

/// Middleware enforcing the per-address limit.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = addr.ip();
    let decision = limiter.check(client);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, limit = decision.limit, "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = ApiError::RateLimited.into_response();
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(ceil_secs(decision.reset_after)),
        );
        response
    };

    let headers = response.headers_mut();
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(ceil_secs(decision.reset_after)));
    response
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs,
        })
    }

    #[test]
    fn test_window_exhaustion() {
        let limiter = limiter(60, 60);
        let client: IpAddr = "203.0.113.7".parse().unwrap();
        let start = Instant::now();

        for i in 0..60 {
            let d = limiter.check_at(client, start + Duration::from_millis(i));
            assert!(d.allowed, "request {i} should pass");
        }
        let d = limiter.check_at(client, start + Duration::from_secs(30));
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert_eq!(d.reset_after, Duration::from_secs(30));
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(2, 60);
        let client: IpAddr = "203.0.113.7".parse().unwrap();
        let start = Instant::now();

        assert!(limiter.check_at(client, start).allowed);
        assert!(limiter.check_at(client, start).allowed);
        assert!(!limiter.check_at(client, start + Duration::from_secs(59)).allowed);

        let d = limiter.check_at(client, start + Duration::from_secs(60));
        assert!(d.allowed);
        assert_eq!(d.remaining, 1);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 60);
        let start = Instant::now();
        let a: IpAddr = "203.0.113.1".parse().unwrap();
        let b: IpAddr = "2001:db8::2".parse().unwrap();

        assert!(limiter.check_at(a, start).allowed);
        assert!(!limiter.check_at(a, start).allowed);
        assert!(limiter.check_at(b, start).allowed);
    }

    #[test]
    fn test_sweep_drops_expired() {
        let limiter = limiter(5, 10);
        let start = Instant::now();
        limiter.check_at("203.0.113.1".parse().unwrap(), start);
        limiter.check_at("203.0.113.2".parse().unwrap(), start + Duration::from_secs(8));

        assert_eq!(limiter.sweep_at(start + Duration::from_secs(11)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_sweep_with_concurrent_inserts() {
        let limiter = Arc::new(limiter(5, 10));
        let start = Instant::now();
        for i in 0..200u32 {
            limiter.check_at(IpAddr::from((0xCB00_7100u32 + i).to_be_bytes()), start);
        }

        let writer = {
            let limiter = Arc::clone(&limiter);
            std::thread::spawn(move || {
                for i in 0..2000u32 {
                    limiter.check_at(IpAddr::from((0x0A00_0000u32 + i).to_be_bytes()), start + Duration::from_secs(20));
                }
            })
        };

        let evicted = limiter.sweep_at(start + Duration::from_secs(15));
        writer.join().unwrap();

        assert_eq!(evicted, 200);
        assert_eq!(limiter.tracked_clients(), 2000);
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(Duration::from_secs(3)), 3);
        assert_eq!(ceil_secs(Duration::from_millis(2001)), 3);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }
}
