use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::ThrottleError;

/// Sliding-window limiter shared by every caller of one guarded operation.
///
/// The decision (prune, count, append) happens under a single lock, so
/// concurrent callers can never jointly exceed `max_calls` inside a window.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: u32,
    time_frame: Duration,
    call_log: Mutex<VecDeque<Instant>>, // admitted calls, oldest first
}

impl RateLimiter {
    pub fn new(max_calls: u32, time_frame: Duration) -> Result<Self, ThrottleError> {
        if max_calls == 0 {
            return Err(ThrottleError::InvalidConfiguration(
                "max_calls must be greater than zero".to_string(),
            ));
        }
        if time_frame.is_zero() {
            return Err(ThrottleError::InvalidConfiguration(
                "time_frame must be greater than zero".to_string(),
            ));
        }

        info!(
            "Rate limiter created: {} calls per {:?}",
            max_calls, time_frame
        );

        Ok(Self {
            max_calls,
            time_frame,
            call_log: Mutex::new(VecDeque::new()),
        })
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    pub fn time_frame(&self) -> Duration {
        self.time_frame
    }

    /// Admits the call and records it, or rejects it without touching the log.
    pub fn try_admit(&self) -> Result<(), ThrottleError> {
        let mut log = self.lock_log();
        let now = Instant::now();

        // Evict timestamps that fell out of the window
        while let Some(&front) = log.front() {
            if now.duration_since(front) >= self.time_frame {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() >= self.max_calls as usize {
            warn!(
                "Rate limit exceeded: {} calls in the last {:?}",
                log.len(),
                self.time_frame
            );
            return Err(ThrottleError::RateLimitExceeded);
        }

        log.push_back(now);
        debug!("Call admitted ({}/{})", log.len(), self.max_calls);
        Ok(())
    }

    /// Calls admitted within the trailing window, as of now.
    pub fn recent_calls(&self) -> usize {
        let log = self.lock_log();
        let now = Instant::now();
        log.iter()
            .filter(|&&ts| now.duration_since(ts) < self.time_frame)
            .count()
    }

    pub fn guard<F>(self: &Arc<Self>, op: F) -> Guarded<F> {
        Guarded {
            limiter: Arc::clone(self),
            op,
        }
    }

    // A panic elsewhere never leaves the deque half-written.
    fn lock_log(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.call_log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An operation that only runs when its limiter admits the call.
#[derive(Debug, Clone)]
pub struct Guarded<F> {
    limiter: Arc<RateLimiter>,
    op: F,
}

impl<F> Guarded<F> {
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub async fn call<Req, Fut, T, E>(&self, req: Req) -> Result<T, E>
    where
        F: Fn(Req) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ThrottleError>,
    {
        self.limiter.try_admit()?;
        (self.op)(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn rejects_zero_max_calls() {
        let err = RateLimiter::new(0, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ThrottleError::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_zero_time_frame() {
        let err = RateLimiter::new(8, Duration::ZERO).unwrap_err();
        assert!(matches!(err, ThrottleError::InvalidConfiguration(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn largest_ceiling_allocates_lazily() {
        let limiter = RateLimiter::new(u32::MAX, Duration::from_secs(60)).unwrap();
        assert_eq!(limiter.max_calls(), u32::MAX);
        for _ in 0..100 {
            limiter.try_admit().unwrap();
        }
        assert_eq!(limiter.recent_calls(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_max_calls_then_rejects() {
        let limiter = RateLimiter::new(8, Duration::from_secs(1)).unwrap();

        for _ in 0..8 {
            assert!(limiter.try_admit().is_ok());
        }
        assert_eq!(limiter.try_admit(), Err(ThrottleError::RateLimitExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_at_exact_boundary() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1)).unwrap();
        limiter.try_admit().unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        limiter.try_admit().unwrap();

        tokio::time::advance(Duration::from_millis(499)).await;
        assert!(limiter.try_admit().is_err());

        // First call is now exactly one window old
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(limiter.try_admit().is_ok());
        assert!(limiter.try_admit().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_attempts_leave_log_untouched() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10)).unwrap();
        for _ in 0..3 {
            limiter.try_admit().unwrap();
        }
        for _ in 0..20 {
            assert!(limiter.try_admit().is_err());
        }
        assert_eq!(limiter.recent_calls(), 3);
        assert_eq!(limiter.lock_log().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn log_stays_bounded_over_many_windows() {
        let limiter = RateLimiter::new(4, Duration::from_millis(100)).unwrap();
        for _ in 0..50 {
            while limiter.try_admit().is_ok() {}
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        assert!(limiter.lock_log().len() <= 4);
        assert_eq!(limiter.recent_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn guarded_skips_operation_when_rejected() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(1)).unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let guarded = limiter.guard(move |n: usize| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(n, Ordering::SeqCst);
                Ok::<_, ThrottleError>(n)
            }
        });

        assert_eq!(guarded.call(5).await, Ok(5));
        assert_eq!(guarded.call(5).await, Err(ThrottleError::RateLimitExceeded));
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }
}
