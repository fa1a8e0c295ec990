//! Per-IP rate limiting applied as a tower layer.
//!
//! Two instances run in the app: a general API limiter and a stricter one on
//! the login route. Each keeps an independent token bucket per client IP.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use governor::{
    clock::DefaultClock, state::direct::NotKeyed, state::InMemoryState, Quota, RateLimiter,
};
use serde_json::json;
use tower::{Layer, Service};
use tracing::debug;

type Bucket = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

struct BucketEntry {
    bucket: Arc<Bucket>,
    last_seen: Instant,
}

/// Token buckets keyed by client IP.
pub struct IpRateLimiter {
    quota: Quota,
    buckets: DashMap<IpAddr, BucketEntry>,
}

impl IpRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Arc<Self> {
        let burst = NonZeroU32::new(max_requests.max(1)).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);
        Arc::new(Self {
            quota,
            buckets: DashMap::new(),
        })
    }

    /// Returns false when the caller has exhausted its quota.
    pub fn check(&self, ip: IpAddr) -> bool {
        let bucket = {
            let mut entry = self.buckets.entry(ip).or_insert_with(|| BucketEntry {
                bucket: Arc::new(RateLimiter::direct(self.quota)),
                last_seen: Instant::now(),
            });
            entry.last_seen = Instant::now();
            Arc::clone(&entry.bucket)
        };
        bucket.check().is_ok()
    }

    /// Drops buckets that no request has touched for `max_idle`. Eviction
    /// goes by last access only; a live bucket keeps whatever tokens it has.
    fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.buckets.len();
        let now = Instant::now();
        self.buckets
            .retain(|_, entry| now.duration_since(entry.last_seen) < max_idle);
        before - self.buckets.len()
    }

    /// Periodically evicts idle buckets so the map does not grow without
    /// bound. An IP idle for a full sweep interval has refilled anyway.
    pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = limiter.prune_idle(interval);
                debug!(removed, "idle rate limiter buckets pruned");
            }
        });
    }
}

/// Best-effort client IP: proxy headers first, then the socket address.
pub fn extract_client_ip(req: &Request) -> IpAddr {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded
            .split(',')
            .next()
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return ip;
        }
    }
    if let Some(ip) = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn too_many_requests() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "status": "error",
            "message": "Too many requests, please try again later",
        })),
    )
        .into_response()
}

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<IpRateLimiter>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<IpRateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit {
            inner,
            limiter: Arc::clone(&self.limiter),
        }
    }
}

#[derive(Clone)]
pub struct RateLimit<S> {
    inner: S,
    limiter: Arc<IpRateLimiter>,
}

impl<S> Service<Request> for RateLimit<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let ip = extract_client_ip(&req);
        if !self.limiter.check(ip) {
            debug!(%ip, "request rejected by rate limiter");
            return Box::pin(async move { Ok(too_many_requests()) });
        }

        // Take the ready inner service, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn limiter_allows_burst_then_rejects() {
        let limiter = IpRateLimiter::new(3, Duration::from_secs(900));
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
    }

    #[test]
    fn limiter_tracks_ips_independently() {
        let limiter = IpRateLimiter::new(1, Duration::from_secs(900));
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        assert!(limiter.check(ip(2)));
    }

    #[test]
    fn cleanup_keeps_active_buckets_and_their_tokens() {
        let limiter = IpRateLimiter::new(2, Duration::from_secs(900));
        assert!(limiter.check(ip(1)));
        // A recently-seen bucket survives the sweep with its remaining
        // token intact.
        assert_eq!(limiter.prune_idle(Duration::from_secs(60)), 0);
        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
    }

    #[test]
    fn cleanup_drops_idle_buckets() {
        let limiter = IpRateLimiter::new(1, Duration::from_secs(900));
        assert!(limiter.check(ip(1)));
        assert!(limiter.check(ip(2)));
        assert_eq!(limiter.prune_idle(Duration::ZERO), 2);
        assert!(limiter.buckets.is_empty());
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let req = request(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(extract_client_ip(&req), "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_header() {
        let req = request(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(extract_client_ip(&req), "198.51.100.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn client_ip_defaults_when_nothing_present() {
        let req = request(&[]);
        assert_eq!(extract_client_ip(&req), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
