//! Per-client fixed-window rate limiting.
//!
//! One `RateLimiter` per endpoint. Clients are keyed by peer IP; requests that
//! arrive without connection info share one bucket.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use tracing::warn;

use crate::errors::AppError;

/// Past this many tracked clients, expired buckets are pruned on the next check.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

struct Inner {
    name: &'static str,
    limit: u32,
    window: Duration,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    /// `limit` requests per `window` per client. A limit of 0 disables the check.
    pub fn new(name: &'static str, limit: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                limit,
                window,
                buckets: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Counts one request. On rejection returns how long until the window resets.
    pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Result<(), Duration> {
        let inner = &self.inner;
        if inner.limit == 0 {
            return Ok(());
        }

        let mut buckets = inner.buckets.lock();
        if buckets.len() > PRUNE_THRESHOLD {
            buckets.retain(|_, b| now.saturating_duration_since(b.started) < inner.window);
        }

        let bucket = buckets.entry(client).or_insert(Bucket {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(bucket.started);
        if elapsed >= inner.window {
            *bucket = Bucket {
                started: now,
                count: 0,
            };
        }

        if bucket.count >= inner.limit {
            return Err(inner.window.saturating_sub(elapsed));
        }
        bucket.count += 1;
        Ok(())
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.inner.buckets.lock().len()
    }
}

/// Middleware: rejects the request with 429 once the client's window is full.
pub async fn enforce(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_ip(&request);

    match limiter.check(client) {
        Ok(()) => Ok(next.run(request).await),
        Err(retry_after) => {
            warn!(
                "Rate limit hit on {} for {client} (limit {} per {:?})",
                limiter.inner.name, limiter.inner.limit, limiter.inner.window
            );
            Err(AppError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            })
        }
    }
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new("test", 3, Duration::from_secs(60));
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at(ip(1), now).is_ok());
        }
        let retry = limiter.check_at(ip(1), now).unwrap_err();
        assert_eq!(retry, Duration::from_secs(60));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now).is_ok());
        assert!(limiter.check_at(ip(1), now).is_err());
        assert!(limiter.check_at(ip(2), now).is_ok());
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(ip(1), start).is_ok());

        let retry = limiter
            .check_at(ip(1), start + Duration::from_secs(45))
            .unwrap_err();
        assert_eq!(retry, Duration::from_secs(15));

        assert!(limiter
            .check_at(ip(1), start + Duration::from_secs(60))
            .is_ok());
    }

    #[test]
    fn test_zero_limit_disables() {
        let limiter = RateLimiter::new("test", 0, Duration::from_secs(60));
        for _ in 0..100 {
            assert!(limiter.check(ip(1)).is_ok());
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_expired_buckets_pruned() {
        let limiter = RateLimiter::new("test", 5, Duration::from_secs(60));
        let start = Instant::now();
        for i in 0..=PRUNE_THRESHOLD as u32 {
            let client = IpAddr::V4(Ipv4Addr::from(i));
            limiter.check_at(client, start).unwrap();
        }
        assert_eq!(limiter.tracked_clients(), PRUNE_THRESHOLD + 1);

        limiter
            .check_at(ip(1), start + Duration::from_secs(120))
            .unwrap();
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
