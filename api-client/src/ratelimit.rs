//! Process-wide admission control for outbound API requests.
//!
//! A [`RateLimiter`] combines three policies:
//! - a reservoir of tokens which is reset to a fixed amount on a fixed schedule,
//! - at most one request in flight at a time,
//! - a minimum spacing between the start of consecutive requests.
//!
//! All clones of a limiter share the same state, so every request routed
//! through a [`RateLimitLayer`] built from any clone counts against the same
//! budget.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tower::ServiceExt as _;

/// Parameters for a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Tokens available when the limiter is created.
    pub reservoir: u32,

    /// The reservoir is reset to this many tokens at each refill.
    pub refill_amount: u32,

    /// Time between reservoir refills.
    pub refill_interval: Duration,

    /// Minimum time between the start of two requests.
    pub min_time: Duration,
}

impl RateLimit {
    /// Limits for the GitHub REST API: 5000 requests per hour, one at a time,
    /// no more than 5 per second.
    pub const fn github() -> Self {
        Self {
            reservoir: 5000,
            refill_amount: 5000,
            refill_interval: Duration::from_secs(60 * 60),
            min_time: Duration::from_millis(200),
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::github()
    }
}

#[derive(Debug)]
struct Reservoir {
    tokens: u32,
    next_refill: Instant,
    last_start: Option<Instant>,
}

impl Reservoir {
    fn refill(&mut self, limit: &RateLimit, now: Instant) {
        if now < self.next_refill {
            return;
        }

        self.tokens = limit.refill_amount;
        if limit.refill_interval.is_zero() {
            self.next_refill = now;
            return;
        }

        while self.next_refill <= now {
            self.next_refill += limit.refill_interval;
        }
    }
}

/// Shared admission control. Cheap to clone.
#[derive(Clone)]
pub struct RateLimiter {
    limit: RateLimit,
    state: Arc<Mutex<Reservoir>>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter with a full reservoir.
    pub fn new(limit: RateLimit) -> Self {
        let state = Reservoir {
            tokens: limit.reservoir,
            next_refill: Instant::now() + limit.refill_interval,
            last_start: None,
        };

        Self {
            limit,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A limiter configured for the GitHub REST API.
    pub fn github() -> Self {
        Self::new(RateLimit::github())
    }

    /// The parameters of this limiter.
    pub fn limit(&self) -> &RateLimit {
        &self.limit
    }

    /// Tokens left in the reservoir right now.
    pub async fn remaining(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.refill(&self.limit, Instant::now());
        state.tokens
    }

    /// Wait until a request may start.
    ///
    /// The returned permit must be held for as long as the request is in
    /// flight; no other permit is issued until it is dropped. Waiters are
    /// admitted in the order they called `acquire`.
    pub async fn acquire(&self) -> Permit {
        let mut state = Arc::clone(&self.state).lock_owned().await;

        state.refill(&self.limit, Instant::now());
        if state.tokens == 0 {
            tracing::debug!(
                "Rate limit reservoir is empty, waiting {:?} for refill",
                state.next_refill.saturating_duration_since(Instant::now())
            );
            let refill = state.next_refill;
            tokio::time::sleep_until(refill).await;
            state.refill(&self.limit, Instant::now());
        }

        if let Some(last) = state.last_start {
            let ready = last + self.limit.min_time;
            if ready > Instant::now() {
                tracing::trace!("Spacing requests, waiting until {:?}", ready);
                tokio::time::sleep_until(ready).await;
            }
        }

        state.tokens = state.tokens.saturating_sub(1);
        state.last_start = Some(Instant::now());
        Permit { _state: state }
    }
}

/// Proof of admission from a [`RateLimiter`]. Dropping it lets the next
/// request start.
pub struct Permit {
    _state: OwnedMutexGuard<Reservoir>,
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit").finish()
    }
}

/// Layer which routes every request through a shared [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct RateLimitLayer {
    limiter: RateLimiter,
}

impl RateLimitLayer {
    /// Create a layer admitting requests through `limiter`.
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl<S> tower::Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Service which holds a rate limit permit until the inner service responds.
#[derive(Debug, Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: RateLimiter,
}

impl<S, R> tower::Service<R> for RateLimitService<S>
where
    S: tower::Service<R> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    R: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send + 'static>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is checked after admission, in `call`.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: R) -> Self::Future {
        let limiter = self.limiter.clone();
        let inner = self.inner.clone();
        Box::pin(async move {
            let _permit = limiter.acquire().await;
            inner.oneshot(req).await
        })
    }
}
