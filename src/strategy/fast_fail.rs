//! Fast fail: reject calls while the circuit is open
//!
//! While the circuit is closed this strategy is fully transparent. While it
//! is open, calls fail immediately with [`BreakerError::CircuitOpen`] without
//! ever reaching the inner handler; this is what gives an open circuit its
//! load-shedding property. Combine with
//! [`ConsecutiveFailuresLayer`](super::ConsecutiveFailuresLayer) to open the
//! circuit and [`RecloseLayer`](super::RecloseLayer) to close it again.

use std::sync::Arc;

use tower::Layer;
use tracing::debug;

use crate::circuit::CircuitState;
use crate::error::BreakerError;
use crate::handler::{ArcHandler, Callee, Handler, HandlerFuture};

/// Strategy factory for fast-fail. No parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastFailLayer;

impl FastFailLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<Req, Res> Layer<ArcHandler<Req, Res>> for FastFailLayer
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Service = ArcHandler<Req, Res>;

    fn layer(&self, inner: ArcHandler<Req, Res>) -> Self::Service {
        Arc::new(FastFail { inner })
    }
}

struct FastFail<Req, Res> {
    inner: ArcHandler<Req, Res>,
}

impl<Req, Res> Handler<Req, Res> for FastFail<Req, Res>
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
        if state.is_open() {
            debug!("circuit open, rejecting call");
            return Box::pin(async { Err::<Res, _>(BreakerError::CircuitOpen) });
        }
        self.inner.call(state, callee, req)
    }
}
