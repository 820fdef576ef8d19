//! Retry: repeat failed calls according to an interval policy
//!
//! Each attempt is a fresh inward call, so strategies *beneath* the retry see
//! every attempt individually (a consecutive-failure breaker below counts
//! each retry as its own failure) while strategies *above* it see the whole
//! sequence as one call. The wait between attempts suspends only the calling
//! task. When the policy signals stop, the most recent failure is re-raised
//! unchanged.

use std::sync::Arc;

use tokio::time::sleep;
use tower::Layer;
use tracing::{debug, warn};

use crate::circuit::CircuitState;
use crate::handler::{ArcHandler, Callee, Handler, HandlerFuture};
use crate::interval::IntervalPolicy;

/// Strategy factory for retry.
#[derive(Clone)]
pub struct RetryLayer {
    policy: Arc<dyn IntervalPolicy>,
}

impl RetryLayer {
    pub fn new<P>(policy: P) -> Self
    where
        P: IntervalPolicy + 'static,
    {
        Self {
            policy: Arc::new(policy),
        }
    }
}

impl<Req, Res> Layer<ArcHandler<Req, Res>> for RetryLayer
where
    Req: Clone + Send + 'static,
    Res: Send + 'static,
{
    type Service = ArcHandler<Req, Res>;

    fn layer(&self, inner: ArcHandler<Req, Res>) -> Self::Service {
        Arc::new(Retry {
            inner,
            policy: Arc::clone(&self.policy),
        })
    }
}

struct Retry<Req, Res> {
    inner: ArcHandler<Req, Res>,
    policy: Arc<dyn IntervalPolicy>,
}

impl<Req, Res> Handler<Req, Res> for Retry<Req, Res>
where
    Req: Clone + Send + 'static,
    Res: Send + 'static,
{
    fn call(
        &self,
        state: Arc<CircuitState>,
        callee: Callee<Req, Res>,
        req: Req,
    ) -> HandlerFuture<Res> {
        let inner = Arc::clone(&self.inner);
        let policy = Arc::clone(&self.policy);
        Box::pin(async move {
            let mut attempt: u32 = 1;
            loop {
                match inner
                    .call(Arc::clone(&state), Arc::clone(&callee), req.clone())
                    .await
                {
                    Ok(value) => {
                        if attempt > 1 {
                            debug!("call succeeded on attempt {}", attempt);
                        }
                        return Ok(value);
                    }
                    Err(err) => match policy.delay(attempt) {
                        None => {
                            warn!("giving up after {} attempts: {}", attempt, err);
                            return Err(err);
                        }
                        Some(delay) => {
                            debug!("attempt {} failed: {}, retrying in {:?}", attempt, err, delay);
                            if !delay.is_zero() {
                                sleep(delay).await;
                            }
                            attempt += 1;
                        }
                    },
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tower::BoxError;

    use crate::circuit::Circuit;
    use crate::error::BreakerError;
    use crate::interval;

    fn counting_callee(
        calls: Arc<AtomicUsize>,
        succeed_on: usize,
    ) -> crate::handler::Callee<(), usize> {
        crate::handler::callee(move |_| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= succeed_on {
                    Ok(n)
                } else {
                    Err::<usize, BoxError>("down".into())
                }
            }
        })
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mut circuit: Circuit<(), usize> = Circuit::new();
        circuit.apply(RetryLayer::new(interval::fixed(Duration::from_millis(1), 5)));

        let calls = Arc::new(AtomicUsize::new(0));
        let out = circuit
            .invoke_callee(counting_callee(calls.clone(), 3), ())
            .await;
        assert_eq!(out.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_reraise_the_last_failure() {
        let mut circuit: Circuit<(), usize> = Circuit::new();
        circuit.apply(RetryLayer::new(interval::fixed(
            Duration::from_millis(20),
            3,
        )));

        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();
        let err = circuit
            .invoke_callee(counting_callee(calls.clone(), usize::MAX), ())
            .await
            .unwrap_err();

        assert!(matches!(err, BreakerError::Dependency(_)));
        // exactly max_tries invocations, with a wait between each pair
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn zero_delay_retries_immediately() {
        let mut circuit: Circuit<(), usize> = Circuit::new();
        circuit.apply(RetryLayer::new(|attempt: u32| {
            (attempt < 4).then_some(Duration::ZERO)
        }));

        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();
        let _ = circuit
            .invoke_callee(counting_callee(calls.clone(), usize::MAX), ())
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
