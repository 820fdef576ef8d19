//! Timeout: bound how long the caller waits for the inward call
//!
//! The inward call is spawned on its own task and the caller waits up to the
//! window for it to finish. If the window elapses first the call fails with
//! [`BreakerError::Timeout`] — but the spawned call is **not cancelled**. It
//! may still complete later with its side effects applied, so retry-on-timeout
//! is only safe for idempotent operations. That fire-and-forget semantic is
//! deliberate; adding cancellation here would silently change the
//! retry-safety guarantees of everything composed above this layer.

use std::sync::Arc;
use std::time::Duration;

use tower::Layer;
use tracing::warn;

use crate::circuit::CircuitState;
use crate::error::BreakerError;
use crate::handler::{ArcHandler, Callee, Handler, HandlerFuture};

/// Strategy factory for timeouts.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    window: Duration,
}

impl TimeoutLayer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

impl<Req, Res> Layer<ArcHandler<Req, Res>> for TimeoutLayer
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Service = ArcHandler<Req, Res>;

    fn layer(&self, inner: ArcHandler<Req, Res>) -> Self::Service {
        Arc::new(Timeout {
            inner,
            window: self.window,
        })
    }
}

struct Timeout<Req, Res> {
    inner: ArcHandler<Req, Res>,
    window: Duration,
}

impl<Req, Res> Handler<Req, Res> for Timeout<Req, Res>
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
        let fut = self.inner.call(state, callee, req);
        let window = self.window;
        Box::pin(async move {
            // dropping the join handle detaches the task instead of
            // cancelling it
            let handle = tokio::spawn(fut);
            match tokio::time::timeout(window, handle).await {
                Ok(Ok(out)) => out,
                Ok(Err(join)) => Err(BreakerError::Dependency(join.into())),
                Err(_) => {
                    warn!("call did not complete within {:?}", window);
                    Err(BreakerError::Timeout { timeout: window })
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::sleep;
    use tower::BoxError;

    use crate::circuit::Circuit;

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let mut circuit: Circuit<u32, u32> = Circuit::new();
        circuit.apply(TimeoutLayer::new(Duration::from_millis(100)));
        let out = circuit
            .invoke(|x| async move { Ok::<_, BoxError>(x) }, 5)
            .await;
        assert_eq!(out.unwrap(), 5);
    }

    #[tokio::test]
    async fn slow_calls_fail_with_timeout() {
        let mut circuit: Circuit<(), ()> = Circuit::new();
        circuit.apply(TimeoutLayer::new(Duration::from_millis(10)));
        let err = circuit
            .invoke(
                |_| async {
                    sleep(Duration::from_millis(100)).await;
                    Ok::<_, BoxError>(())
                },
                (),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BreakerError::Timeout { timeout } if timeout == Duration::from_millis(10)
        ));
    }

    #[tokio::test]
    async fn timed_out_call_still_runs_to_completion() {
        let mut circuit: Circuit<(), ()> = Circuit::new();
        circuit.apply(TimeoutLayer::new(Duration::from_millis(10)));

        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let err = circuit
            .invoke(
                move |_| {
                    let flag = flag.clone();
                    async move {
                        sleep(Duration::from_millis(50)).await;
                        flag.store(true, Ordering::SeqCst);
                        Ok::<_, BoxError>(())
                    }
                },
                (),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BreakerError::Timeout { .. }));
        assert!(!finished.load(Ordering::SeqCst));

        // the abandoned call keeps running and applies its side effects
        sleep(Duration::from_millis(80)).await;
        assert!(finished.load(Ordering::SeqCst));
    }
}
