//! The circuit: an open/closed flag plus the composed call pipeline
//!
//! A [`Circuit`] is the stateful guard placed in front of one logical
//! dependency. It owns exactly two things: the shared open/closed flag
//! ([`CircuitState`]) and the current pipeline head. Strategies applied with
//! [`Circuit::apply`] (or via [`CircuitBuilder`](crate::builder::CircuitBuilder))
//! replace the pipeline with a wrapped one; invoking the circuit invokes the
//! outermost handler.
//!
//! A circuit is typically a long-lived singleton per dependency. Re-creating
//! one per call discards all learned state (failure streaks, cache contents,
//! rate history) and defeats the purpose. Clones share the flag and whatever
//! pipeline had been built at clone time.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tower::{BoxError, Layer};

use crate::error::Result;
use crate::handler::{callee, ArcHandler, Callee, Passthrough};

/// The open/closed flag shared by every strategy attached to one circuit.
///
/// Closed means calls are allowed through; open causes fast-fail to reject
/// them. Transitions are idempotent and linearizable (SeqCst); strategies
/// observe a new state on their next invocation rather than being notified.
#[derive(Debug, Default)]
pub struct CircuitState {
    open: AtomicBool,
}

impl CircuitState {
    pub fn is_closed(&self) -> bool {
        !self.open.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// A guard for calls to one unreliable dependency.
pub struct Circuit<Req, Res> {
    state: Arc<CircuitState>,
    pipeline: ArcHandler<Req, Res>,
}

impl<Req, Res> Circuit<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    /// A new circuit: closed, with a pass-through pipeline. Without any
    /// strategies applied it simply forwards calls and never opens.
    pub fn new() -> Self {
        Self::with_pipeline(Arc::new(Passthrough))
    }

    pub(crate) fn with_pipeline(pipeline: ArcHandler<Req, Res>) -> Self {
        Self {
            state: Arc::new(CircuitState::default()),
            pipeline,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Manually open the circuit. Idempotent.
    pub fn open(&self) {
        self.state.open();
    }

    /// Manually close the circuit. Idempotent.
    pub fn close(&self) {
        self.state.close();
    }

    /// The shared flag, for hand-written [`Handler`](crate::handler::Handler)
    /// implementations and tests.
    pub fn state(&self) -> &Arc<CircuitState> {
        &self.state
    }

    /// Wrap the current pipeline in one more strategy. The strategy applied
    /// last runs first on each call and last on the way back.
    pub fn apply<L>(&mut self, layer: L)
    where
        L: Layer<ArcHandler<Req, Res>, Service = ArcHandler<Req, Res>>,
    {
        self.pipeline = layer.layer(Arc::clone(&self.pipeline));
    }

    /// Invoke the dependency through the pipeline.
    pub async fn invoke<F, Fut>(&self, f: F, req: Req) -> Result<Res>
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Res, BoxError>> + Send + 'static,
    {
        self.invoke_callee(callee(f), req).await
    }

    /// Invoke with a pre-built [`Callee`], avoiding re-wrapping per call.
    pub async fn invoke_callee(&self, callee: Callee<Req, Res>, req: Req) -> Result<Res> {
        self.pipeline
            .call(Arc::clone(&self.state), callee, req)
            .await
    }
}

impl<Req, Res> Default for Circuit<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res> Clone for Circuit<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BreakerError;

    #[test]
    fn starts_closed_and_transitions_are_idempotent() {
        let circuit: Circuit<(), ()> = Circuit::new();
        assert!(circuit.is_closed());
        assert!(!circuit.is_open());

        circuit.open();
        circuit.open();
        assert!(circuit.is_open());

        circuit.close();
        circuit.close();
        assert!(circuit.is_closed());
    }

    #[tokio::test]
    async fn unadorned_circuit_forwards_calls() {
        let circuit: Circuit<u32, u32> = Circuit::new();
        let out = circuit
            .invoke(|x| async move { Ok::<_, BoxError>(x + 1) }, 41)
            .await;
        assert_eq!(out.unwrap(), 42);
        // no strategy attached, so failures never open it
        let err = circuit
            .invoke(|_| async move { Err::<u32, BoxError>("down".into()) }, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, BreakerError::Dependency(_)));
        assert!(circuit.is_closed());
    }

    #[tokio::test]
    async fn clones_share_the_flag() {
        let circuit: Circuit<(), ()> = Circuit::new();
        let other = circuit.clone();
        circuit.open();
        assert!(other.is_open());
        other.close();
        assert!(circuit.is_closed());
    }
}
