//! Consecutive failures: trip the breaker after an unbroken failure streak
//!
//! Maintains a streak counter that any success resets to zero. When the
//! streak reaches the threshold the circuit is opened; the original failure
//! is always re-raised unchanged either way. This strategy never converts a
//! failure into a success, it only observes and may trip the breaker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tower::Layer;
use tracing::warn;

use crate::circuit::CircuitState;
use crate::handler::{ArcHandler, Callee, Handler, HandlerFuture};

/// Strategy factory for consecutive-failure breaking.
#[derive(Debug, Clone, Copy)]
pub struct ConsecutiveFailuresLayer {
    threshold: usize,
}

impl ConsecutiveFailuresLayer {
    /// `threshold` is the streak length that opens the circuit.
    ///
    /// # Panics
    /// Panics if `threshold` is zero.
    pub fn new(threshold: usize) -> Self {
        assert!(threshold > 0, "failure threshold must be positive");
        Self { threshold }
    }
}

impl<Req, Res> Layer<ArcHandler<Req, Res>> for ConsecutiveFailuresLayer
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Service = ArcHandler<Req, Res>;

    fn layer(&self, inner: ArcHandler<Req, Res>) -> Self::Service {
        Arc::new(ConsecutiveFailures {
            inner,
            threshold: self.threshold,
            streak: Arc::new(AtomicUsize::new(0)),
        })
    }
}

struct ConsecutiveFailures<Req, Res> {
    inner: ArcHandler<Req, Res>,
    threshold: usize,
    streak: Arc<AtomicUsize>,
}

impl<Req, Res> Handler<Req, Res> for ConsecutiveFailures<Req, Res>
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
        let streak = Arc::clone(&self.streak);
        let threshold = self.threshold;
        Box::pin(async move {
            match inner.call(Arc::clone(&state), callee, req).await {
                Ok(value) => {
                    streak.store(0, Ordering::SeqCst);
                    Ok(value)
                }
                Err(err) => {
                    let failures = streak.fetch_add(1, Ordering::SeqCst) + 1;
                    if failures >= threshold {
                        if failures == threshold {
                            warn!("opening circuit after {} consecutive failures", failures);
                        }
                        state.open();
                    }
                    Err(err)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::BoxError;

    use crate::circuit::Circuit;
    use crate::error::BreakerError;

    fn guarded(threshold: usize) -> Circuit<bool, ()> {
        let mut circuit = Circuit::new();
        circuit.apply(ConsecutiveFailuresLayer::new(threshold));
        circuit
    }

    async fn call(circuit: &Circuit<bool, ()>, succeed: bool) -> crate::error::Result<()> {
        circuit
            .invoke(
                |succeed| async move {
                    if succeed {
                        Ok(())
                    } else {
                        Err::<(), BoxError>("down".into())
                    }
                },
                succeed,
            )
            .await
    }

    #[tokio::test]
    async fn opens_exactly_at_threshold() {
        let circuit = guarded(3);
        for _ in 0..2 {
            let err = call(&circuit, false).await.unwrap_err();
            assert!(matches!(err, BreakerError::Dependency(_)));
            assert!(circuit.is_closed());
        }
        let err = call(&circuit, false).await.unwrap_err();
        // failure re-raised even though the breaker tripped
        assert!(matches!(err, BreakerError::Dependency(_)));
        assert!(circuit.is_open());
    }

    #[tokio::test]
    async fn success_resets_the_streak() {
        let circuit = guarded(2);
        let _ = call(&circuit, false).await;
        call(&circuit, true).await.unwrap();
        let _ = call(&circuit, false).await;
        assert!(circuit.is_closed());
        let _ = call(&circuit, false).await;
        assert!(circuit.is_open());
    }
}
