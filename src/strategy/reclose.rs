//! Reclose on TTL: automatically close an opened circuit after a deadline
//!
//! On entry, an elapsed deadline closes the circuit and clears the deadline.
//! The call is then delegated regardless of circuit state; this strategy does
//! not itself block calls, so it must sit *outside*
//! [`FastFailLayer`](super::FastFailLayer) (i.e. be applied after it) for the
//! usual open-for-ttl-then-resume cycle. On exit, an open circuit with no
//! armed deadline gets one at `now + ttl`.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tower::Layer;
use tracing::debug;

use crate::circuit::CircuitState;
use crate::handler::{ArcHandler, Callee, Handler, HandlerFuture};

/// Strategy factory for timed reclose.
#[derive(Debug, Clone, Copy)]
pub struct RecloseLayer {
    ttl: Duration,
}

impl RecloseLayer {
    /// `ttl` is how long the circuit stays open before reclosing.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl<Req, Res> Layer<ArcHandler<Req, Res>> for RecloseLayer
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Service = ArcHandler<Req, Res>;

    fn layer(&self, inner: ArcHandler<Req, Res>) -> Self::Service {
        Arc::new(Reclose {
            inner,
            ttl: self.ttl,
            deadline: Arc::new(Mutex::new(None)),
        })
    }
}

struct Reclose<Req, Res> {
    inner: ArcHandler<Req, Res>,
    ttl: Duration,
    // armed only while the circuit is open
    deadline: Arc<Mutex<Option<Instant>>>,
}

impl<Req, Res> Handler<Req, Res> for Reclose<Req, Res>
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
        let deadline = Arc::clone(&self.deadline);
        let ttl = self.ttl;
        Box::pin(async move {
            {
                let mut slot = deadline.lock().unwrap();
                if let Some(at) = *slot {
                    if Instant::now() >= at {
                        debug!("reclose ttl elapsed, closing circuit");
                        state.close();
                        *slot = None;
                    }
                }
            }

            let out = inner.call(Arc::clone(&state), callee, req).await;

            {
                let mut slot = deadline.lock().unwrap();
                if slot.is_none() && state.is_open() {
                    *slot = Some(Instant::now() + ttl);
                }
            }
            out
        })
    }
}
