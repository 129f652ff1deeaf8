//! Tower middleware that puts a [`RateLimiter`] in front of any HTTP service.
//!
//! The wrapped service keeps its request, response and error types. A
//! rejected request resolves straight to the 429 response and never reaches
//! the inner service.

use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    http::Request,
    response::{IntoResponse, Response},
};
use tower::{Layer, Service, ServiceExt};

use crate::errors::ThrottleError;
use crate::rate_limiter::RateLimiter;

/// Builds a layer with its own limiter, one bucket for everything it wraps.
pub fn rate_limited(max_calls: u32, time_frame: Duration) -> Result<RateLimitLayer, ThrottleError> {
    let limiter = RateLimiter::new(max_calls, time_frame)?;
    Ok(RateLimitLayer::new(Arc::new(limiter)))
}

#[derive(Debug, Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimited<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimited {
            inner,
            limiter: Arc::clone(&self.limiter),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimited<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<Request<B>> for RateLimited<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    // Readiness is only claimed on the inner service once a call is admitted.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        match self.limiter.try_admit() {
            Ok(()) => {
                let mut inner = self.inner.clone();
                Box::pin(async move { inner.ready().await?.call(req).await })
            }
            Err(err) => Box::pin(future::ready(Ok(err.into_response()))),
        }
    }
}
