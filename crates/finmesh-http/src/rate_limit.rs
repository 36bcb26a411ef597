//! Per-IP token-bucket rate limiting.
//!
//! Burst capacity is twice the configured RPS; `/health` is exempt. Excess
//! traffic is shed with 429 so internal queues stay unbounded but callers
//! self-throttle at the edge.

use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Instant;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self, rate_per_sec: f64, capacity: f64) -> bool {
        let elapsed = self.last_refill.elapsed().as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate_per_sec).min(capacity);
        self.last_refill = Instant::now();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared per-IP limiter state.
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    rate_per_sec: f64,
    capacity: f64,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        let rps = rps.max(1) as f64;
        Self {
            buckets: Mutex::new(HashMap::new()),
            rate_per_sec: rps,
            capacity: rps * 2.0,
        }
    }

    /// Consume one token for `ip`, reporting whether the request may pass.
    pub fn allow(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter lock poisoned");
        buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.capacity))
            .try_consume(self.rate_per_sec, self.capacity)
    }
}

/// Axum middleware shedding excess per-IP traffic with 429.
pub async fn shed_excess(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.uri().path() != "/health" {
        // ConnectInfo is absent under in-process test routers; those run
        // unlimited rather than failing closed.
        if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
            if !limiter.allow(addr.ip()) {
                return Err(ApiError::RateLimited);
            }
        }
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_twice_rps_then_sheds() {
        let limiter = RateLimiter::new(5);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..10 {
            assert!(limiter.allow(ip));
        }
        assert!(!limiter.allow(ip));
    }

    #[test]
    fn ips_are_limited_independently() {
        let limiter = RateLimiter::new(1);
        let first: IpAddr = "10.0.0.1".parse().unwrap();
        let second: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.allow(first));
        assert!(limiter.allow(first));
        assert!(!limiter.allow(first));
        assert!(limiter.allow(second));
    }
}
