//! Throttle: cap the number of calls within a sliding period
//!
//! Keeps a log of completion timestamps. On each call the log is pruned of
//! entries older than one period, and if the remaining count has reached the
//! cap the call is rejected with [`BreakerError::ThrottleExceeded`] without
//! running the callee or being logged. Calls that do go inward are logged on
//! completion whether they succeeded or failed. The prune-check and the
//! append each run under the log's mutex, so the counted entries can never
//! settle above the cap.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tower::Layer;
use tracing::debug;

use crate::circuit::CircuitState;
use crate::error::BreakerError;
use crate::handler::{ArcHandler, Callee, Handler, HandlerFuture};

/// Strategy factory for throttling.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleLayer {
    cap: usize,
    period: Duration,
}

impl ThrottleLayer {
    /// Allow at most `cap` calls within any window of `period`.
    ///
    /// # Panics
    /// Panics if `cap` is zero.
    pub fn new(cap: usize, period: Duration) -> Self {
        assert!(cap > 0, "throttle cap must be positive");
        Self { cap, period }
    }
}

impl<Req, Res> Layer<ArcHandler<Req, Res>> for ThrottleLayer
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Service = ArcHandler<Req, Res>;

    fn layer(&self, inner: ArcHandler<Req, Res>) -> Self::Service {
        Arc::new(Throttle {
            inner,
            cap: self.cap,
            period: self.period,
            log: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

struct Throttle<Req, Res> {
    inner: ArcHandler<Req, Res>,
    cap: usize,
    period: Duration,
    log: Arc<Mutex<Vec<Instant>>>,
}

impl<Req, Res> Handler<Req, Res> for Throttle<Req, Res>
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
        let log = Arc::clone(&self.log);
        let cap = self.cap;
        let period = self.period;
        Box::pin(async move {
            {
                let mut log = log.lock().unwrap();
                let now = Instant::now();
                log.retain(|at| now.duration_since(*at) < period);
                if log.len() >= cap {
                    debug!("rejecting call: {} calls within {:?}", log.len(), period);
                    return Err(BreakerError::ThrottleExceeded { cap, period });
                }
            }

            let out = inner.call(state, callee, req).await;
            log.lock().unwrap().push(Instant::now());
            out
        })
    }
}
