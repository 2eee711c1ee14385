//! # Rate Limiter (C1)
//!
//! A per-client-IP, per-route-class fixed-window request gate held in
//! process memory.
//!
//! ## Algorithm
//!
//! Each `(client_ip, route_class)` pair tracks a `(count, window_start)`
//! pair. On each request:
//!
//! 1. If `now - window_start > window_seconds`, the window has elapsed:
//!    reset to `(1, now)` and allow.
//! 2. Otherwise, if `count < budget`, increment and allow.
//! 3. Otherwise reject with `Retry-After: floor(window_seconds - elapsed) + 1`.
//!
//! This is a fixed-window counter, not a continuously-refilling token
//! bucket: the window resets in one jump rather than leaking allowance
//! smoothly, which matches the budget/retry-after semantics this server is
//! expected to expose.
//!
//! Entries are swept opportunistically (on a fraction of requests) once they
//! are older than twice the largest configured window, so the table doesn't
//! grow unboundedly with one-off client IPs.
//!
//! ## Route Classes
//!
//! | Class | Prefix | Default budget |
//! |---|---|---|
//! | auth | `/auth/*` | 10 |
//! | token | `/oauth/token` (exact) | 20 |
//! | admin | `/api/admin/*` | 100 |
//! | default | everything else | 200 |
//!
//! `/`, `/health`, `/docs`, and `/openapi.json` are exempt from all classes.
//!
//! Client IP is the first entry of `X-Forwarded-For` when present, otherwise
//! the socket peer address.
//!
//! ## Why In-Process, Not Redis
//!
//! The limiter is explicitly advisory, never a security boundary (see the
//! design notes) — it exists to blunt scanning and code-exchange probing,
//! not to provide a hard guarantee. A `DashMap`-backed in-process table is
//! correct for a single-process deployment; a multi-process deployment would
//! need the shared counters to live in Redis instead, which is a drop-in
//! swap of the storage behind [`RateLimiter`]'s interface but out of scope
//! for this revision.

use crate::config::RateLimitConfig;
use crate::errors::ApiError;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use dashmap::DashMap;
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Paths exempt from rate limiting regardless of class.
const EXEMPT_PATHS: &[&str] = &["/", "/health", "/docs", "/openapi.json"];

/// The route classes a request is bucketed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Auth,
    Token,
    Admin,
    Default,
}

impl RouteClass {
    /// Classifies a request path. `/oauth/token` is an exact match; `/auth`
    /// and `/api/admin` are prefix matches.
    pub fn classify(path: &str) -> Self {
        if path == "/oauth/token" {
            Self::Token
        } else if path.starts_with("/auth/") || path == "/auth" {
            Self::Auth
        } else if path.starts_with("/api/admin/") || path == "/api/admin" {
            Self::Admin
        } else {
            Self::Default
        }
    }

    fn budget(self, config: &RateLimitConfig) -> u32 {
        match self {
            Self::Auth => config.auth_budget,
            Self::Token => config.token_budget,
            Self::Admin => config.admin_budget,
            Self::Default => config.default_budget,
        }
    }
}

/// One fixed window's bookkeeping for a single `(ip, class)` pair.
struct WindowState {
    count: AtomicU64,
    window_start: std::sync::Mutex<Instant>,
}

/// Outcome of a rate-limit check.
pub enum RateLimitDecision {
    Allowed,
    Rejected { retry_after_seconds: u64 },
}

/// The fixed-window rate limiter table.
///
/// Cheap to clone (wraps an `Arc<DashMap<...>>`); create once at startup and
/// share across the middleware stack.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<(String, RouteClass), WindowState>>,
    config: RateLimitConfig,
    /// Every Nth request triggers an opportunistic sweep instead of a
    /// dedicated background task, avoiding a second tokio task per process.
    sweep_counter: Arc<AtomicU64>,
}

const SWEEP_EVERY_N_REQUESTS: u64 = 256;

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            config,
            sweep_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Checks and records one request against the given IP/class.
    pub fn check(&self, client_ip: &str, class: RouteClass) -> RateLimitDecision {
        let budget = class.budget(&self.config) as u64;
        let window = Duration::from_secs(self.config.window_seconds);
        let now = Instant::now();

        let key = (client_ip.to_string(), class);
        let entry = self
            .buckets
            .entry(key)
            .or_insert_with(|| WindowState {
                count: AtomicU64::new(0),
                window_start: std::sync::Mutex::new(now),
            });

        let mut window_start = entry.window_start.lock().expect("rate limiter mutex poisoned");
        let elapsed = now.duration_since(*window_start);

        if elapsed > window {
            *window_start = now;
            entry.count.store(1, Ordering::SeqCst);
            drop(window_start);
            self.maybe_sweep(window);
            return RateLimitDecision::Allowed;
        }

        let previous = entry.count.fetch_add(1, Ordering::SeqCst);
        if previous < budget {
            drop(window_start);
            self.maybe_sweep(window);
            RateLimitDecision::Allowed
        } else {
            let retry_after_seconds = (window.as_secs().saturating_sub(elapsed.as_secs())) + 1;
            drop(window_start);
            self.maybe_sweep(window);
            RateLimitDecision::Rejected {
                retry_after_seconds,
            }
        }
    }

    /// Sweeps entries older than 2x the configured window, run
    /// opportunistically every [`SWEEP_EVERY_N_REQUESTS`] requests rather
    /// than on a dedicated background task.
    fn maybe_sweep(&self, window: Duration) {
        let count = self.sweep_counter.fetch_add(1, Ordering::Relaxed);
        if count % SWEEP_EVERY_N_REQUESTS != 0 {
            return;
        }

        let max_age = window * 2;
        let now = Instant::now();
        self.buckets.retain(|_, state| {
            let window_start = *state.window_start.lock().expect("rate limiter mutex poisoned");
            now.duration_since(window_start) <= max_age
        });
    }
}

/// Resolves the client IP per §4.1: first `X-Forwarded-For` entry, else the
/// peer address.
pub fn client_ip(req: &ServiceRequest) -> String {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path)
}

// =============================================================================
// Actix-web middleware
// =============================================================================

/// Actix `Transform` wrapping [`RateLimiter`] as request middleware.
#[derive(Clone)]
pub struct RateLimitMiddlewareFactory {
    limiter: RateLimiter,
}

impl RateLimitMiddlewareFactory {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
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
        let path = req.path().to_string();

        if is_exempt(&path) {
            let service = Rc::clone(&self.service);
            return Box::pin(async move { service.call(req).await });
        }

        let class = RouteClass::classify(&path);
        let ip = client_ip(&req);
        let decision = self.limiter.check(&ip, class);

        match decision {
            RateLimitDecision::Allowed => {
                let service = Rc::clone(&self.service);
                Box::pin(async move { service.call(req).await })
            }
            RateLimitDecision::Rejected {
                retry_after_seconds,
            } => Box::pin(async move {
                let err: Error = ApiError::TooManyRequests {
                    retry_after_seconds,
                }
                .into();
                Err(err)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            auth_budget: 2,
            token_budget: 2,
            admin_budget: 2,
            default_budget: 2,
            window_seconds: 60,
        }
    }

    #[test]
    fn test_route_classification() {
        assert_eq!(RouteClass::classify("/oauth/token"), RouteClass::Token);
        assert_eq!(RouteClass::classify("/auth/login"), RouteClass::Auth);
        assert_eq!(
            RouteClass::classify("/api/admin/users"),
            RouteClass::Admin
        );
        assert_eq!(RouteClass::classify("/oauth/authorize"), RouteClass::Default);
    }

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/"));
        assert!(is_exempt("/docs"));
        assert!(is_exempt("/openapi.json"));
        assert!(!is_exempt("/oauth/token"));
    }

    #[test]
    fn test_allows_up_to_budget_then_rejects() {
        let limiter = RateLimiter::new(test_config());

        assert!(matches!(
            limiter.check("1.2.3.4", RouteClass::Token),
            RateLimitDecision::Allowed
        ));
        assert!(matches!(
            limiter.check("1.2.3.4", RouteClass::Token),
            RateLimitDecision::Allowed
        ));
        assert!(matches!(
            limiter.check("1.2.3.4", RouteClass::Token),
            RateLimitDecision::Rejected { .. }
        ));
    }

    #[test]
    fn test_different_ips_have_independent_buckets() {
        let limiter = RateLimiter::new(test_config());

        limiter.check("1.1.1.1", RouteClass::Auth);
        limiter.check("1.1.1.1", RouteClass::Auth);

        assert!(matches!(
            limiter.check("2.2.2.2", RouteClass::Auth),
            RateLimitDecision::Allowed
        ));
    }

    #[test]
    fn test_different_classes_have_independent_buckets_for_same_ip() {
        let limiter = RateLimiter::new(test_config());

        limiter.check("9.9.9.9", RouteClass::Auth);
        limiter.check("9.9.9.9", RouteClass::Auth);

        assert!(matches!(
            limiter.check("9.9.9.9", RouteClass::Token),
            RateLimitDecision::Allowed
        ));
    }

    #[test]
    fn test_retry_after_is_positive_when_rejected() {
        let limiter = RateLimiter::new(test_config());
        limiter.check("5.5.5.5", RouteClass::Admin);
        limiter.check("5.5.5.5", RouteClass::Admin);

        match limiter.check("5.5.5.5", RouteClass::Admin) {
            RateLimitDecision::Rejected {
                retry_after_seconds,
            } => assert!(retry_after_seconds > 0),
            RateLimitDecision::Allowed => panic!("expected rejection"),
        }
    }
}
