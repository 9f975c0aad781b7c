//! Client-side request throttling for API clients.
//!
//! A token bucket wrapped as a `tower` layer: up to `burst` requests pass
//! immediately, after which requests are admitted at `qps` per second.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::time::{Instant, Sleep};
use tower::{Layer, Service};

/// Sustained rate and burst size for one client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleSettings {
    pub qps: f32,
    pub burst: u32,
}

impl ThrottleSettings {
    /// Sustained requests per second used for every migration client.
    pub const QPS: f32 = 100.0;
    /// Burst size used for every migration client.
    pub const BURST: u32 = 1000;
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            qps: Self::QPS,
            burst: Self::BURST,
        }
    }
}

#[derive(Debug)]
pub(crate) struct TokenBucket {
    rate: f64,
    capacity: f64,
    tokens: f64,
    last: Instant,
}

impl TokenBucket {
    /// A full bucket.
    pub(crate) fn new(settings: ThrottleSettings, now: Instant) -> Self {
        let capacity = f64::from(settings.burst.max(1));
        Self {
            rate: f64::from(settings.qps),
            capacity,
            tokens: capacity,
            last: now,
        }
    }

    /// Take one token, or return how long until one is available.
    pub(crate) fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        if self.rate <= 0.0 {
            return Ok(());
        }

        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        if now > self.last {
            self.last = now;
        }
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / self.rate))
        }
    }
}

/// Applies [`Throttle`] to a service.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleLayer {
    settings: ThrottleSettings,
}

impl ThrottleLayer {
    pub fn new(settings: ThrottleSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> ThrottleSettings {
        self.settings
    }
}

impl<S> Layer<S> for ThrottleLayer {
    type Service = Throttle<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Throttle {
            inner,
            bucket: TokenBucket::new(self.settings, Instant::now()),
            permit: false,
            sleep: None,
        }
    }
}

/// Token-bucket throttled service. `poll_ready` waits for a token.
pub struct Throttle<S> {
    inner: S,
    bucket: TokenBucket,
    permit: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl<S, Req> Service<Req> for Throttle<S>
where
    S: Service<Req>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        while !self.permit {
            if let Some(sleep) = self.sleep.as_mut() {
                ready!(sleep.as_mut().poll(cx));
                self.sleep = None;
            }
            match self.bucket.try_acquire(Instant::now()) {
                Ok(()) => self.permit = true,
                Err(wait) => {
                    tracing::trace!(wait_ms = %wait.as_millis(), "client-side throttling");
                    self.sleep = Some(Box::pin(tokio::time::sleep(wait)));
                }
            }
        }
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        if !self.permit {
            panic!("throttled service called before poll_ready");
        }
        self.permit = false;
        self.inner.call(req)
    }
}
