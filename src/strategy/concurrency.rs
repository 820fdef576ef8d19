//! Concurrency limit: bound the number of simultaneous in-flight calls
//!
//! Excess calls fail fast with
//! [`BreakerError::ConcurrencyLimitExceeded`] rather than queuing. The
//! in-flight count is acquired with a compare-and-swap loop so a burst of
//! concurrent invocations can never admit more than the limit, and released
//! by a drop guard so the decrement runs on every exit path, including
//! failure and cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tower::Layer;
use tracing::debug;

use crate::circuit::CircuitState;
use crate::error::BreakerError;
use crate::handler::{ArcHandler, Callee, Handler, HandlerFuture};

/// Strategy factory for the concurrency limit.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimitLayer {
    max: usize,
}

impl ConcurrencyLimitLayer {
    /// `max` is the number of calls allowed in flight at once.
    ///
    /// # Panics
    /// Panics if `max` is zero.
    pub fn new(max: usize) -> Self {
        assert!(max > 0, "concurrency limit must be positive");
        Self { max }
    }
}

impl<Req, Res> Layer<ArcHandler<Req, Res>> for ConcurrencyLimitLayer
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Service = ArcHandler<Req, Res>;

    fn layer(&self, inner: ArcHandler<Req, Res>) -> Self::Service {
        Arc::new(ConcurrencyLimit {
            inner,
            max: self.max,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }
}

struct ConcurrencyLimit<Req, Res> {
    inner: ArcHandler<Req, Res>,
    max: usize,
    in_flight: Arc<AtomicUsize>,
}

#[derive(Debug)]
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    /// Increments the count unless the limit is reached; the failed case
    /// reports the count that was observed.
    fn acquire(count: &Arc<AtomicUsize>, max: usize) -> std::result::Result<Self, usize> {
        let mut current = count.load(Ordering::SeqCst);
        loop {
            if current >= max {
                return Err(current);
            }
            match count.compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return Ok(Self(Arc::clone(count))),
                Err(observed) => current = observed,
            }
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<Req, Res> Handler<Req, Res> for ConcurrencyLimit<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn call(
        &self,
        state: Arc<CircuitState>,
        callee: Callee<Req, Res>,
        req: Req,
    ) -> HandlerFuture<Res> {
        let inner = Arc::clone(&self.inner);
        let in_flight = Arc::clone(&self.in_flight);
        let max = self.max;
        Box::pin(async move {
            let _guard = match InFlightGuard::acquire(&in_flight, max) {
                Ok(guard) => guard,
                Err(current) => {
                    debug!("rejecting call: {} in flight (limit {})", current, max);
                    return Err(BreakerError::ConcurrencyLimitExceeded {
                        current,
                        limit: max,
                    });
                }
            };
            inner.call(state, callee, req).await
        })
    }
}
