//! Per-client request throttling for sensitive routes.
//!
//! A fixed-window counter keyed by client IP. All counters for one limiter
//! share a single mutex, so the window-reset check and the increment are
//! atomic per key. Route handlers never see a throttled request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::error::AppError;

struct Window {
    started: Instant,
    count: u32,
}

/// Counter shared by every worker serving one rate-limited route.
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    max_requests: u32,
    window: Duration,
    counters: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, enabled: bool) -> Self {
        Self {
            enabled,
            max_requests,
            window,
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn per_minute(max_requests: u32, enabled: bool) -> Self {
        Self::new(max_requests, Duration::from_secs(60), enabled)
    }

    /// Count one request for `key`; the request that exceeds the budget for
    /// the active window is rejected.
    pub fn check(&self, key: &str) -> Result<(), AppError> {
        if !self.enabled {
            return Ok(());
        }

        let mut counters = self.counters.lock().unwrap();
        let now = Instant::now();

        let window = counters.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            return Err(AppError::RateLimited {
                max_per_minute: self.max_requests,
            });
        }

        window.count += 1;
        Ok(())
    }
}

/// Middleware wrapper applying a [`RateLimiter`] ahead of a route.
pub struct RateLimit {
    limiter: RateLimiter,
}

impl RateLimit {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let key = req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if let Err(err) = self.limiter.check(&key) {
            return Box::pin(async move { Err(err.into()) });
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_within_budget_pass() {
        let limiter = RateLimiter::per_minute(3, true);

        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1").is_ok());
        }
    }

    #[test]
    fn request_over_budget_is_rejected() {
        let limiter = RateLimiter::per_minute(3, true);

        for _ in 0..3 {
            limiter.check("10.0.0.1").unwrap();
        }

        match limiter.check("10.0.0.1") {
            Err(AppError::RateLimited { max_per_minute }) => assert_eq!(max_per_minute, 3),
            other => panic!("Expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::per_minute(1, true);

        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.2").is_ok());
        assert!(limiter.check("10.0.0.1").is_err());
    }

    #[test]
    fn window_elapse_resets_the_counter() {
        let limiter = RateLimiter::new(2, Duration::from_millis(40), true);

        limiter.check("10.0.0.1").unwrap();
        limiter.check("10.0.0.1").unwrap();
        assert!(limiter.check("10.0.0.1").is_err());

        std::thread::sleep(Duration::from_millis(50));

        assert!(limiter.check("10.0.0.1").is_ok());
    }

    #[test]
    fn disabled_limiter_passes_everything() {
        let limiter = RateLimiter::per_minute(1, false);

        for _ in 0..20 {
            assert!(limiter.check("10.0.0.1").is_ok());
        }
    }

    #[test]
    fn no_lost_increments_under_concurrency() {
        let limiter = RateLimiter::per_minute(1000, true);
        let mut handles = Vec::new();

        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(std::thread::spawn(move || {
                let mut accepted = 0u32;
                for _ in 0..200 {
                    if limiter.check("10.0.0.1").is_ok() {
                        accepted += 1;
                    }
                }
                accepted
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1000);
    }
}
