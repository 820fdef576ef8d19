//! Declarative composition of a circuit from an ordered list of strategies
//!
//! `CircuitBuilder` collects strategies and folds them into a single pipeline
//! at `build()`. Strategies are applied in the order they were added, so the
//! last one added is outermost: it runs first on each call and sees the
//! result (or failure) of everything beneath it on the way back. Composing
//! `[a, b]` yields call order `b -> a -> callee`.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use cutout::{interval, CircuitBuilder};
//!
//! let circuit = CircuitBuilder::<String, String>::new()
//!     .consecutive_failures(5)
//!     .fast_fail()
//!     .reclose_after(Duration::from_secs(30))
//!     .retry(interval::doubling(Duration::from_millis(100), 4))
//!     .timeout(Duration::from_secs(2))
//!     .build();
//! ```

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tower::Layer;

use crate::cache::Cache;
use crate::circuit::Circuit;
use crate::handler::{ArcHandler, Passthrough};
use crate::interval::IntervalPolicy;
use crate::strategy::{
    CachingLayer, ConcurrencyLimitLayer, ConsecutiveFailuresLayer, FastFailLayer, RecloseLayer,
    RetryLayer, ThrottleLayer, TimeoutLayer,
};

type ApplyFn<Req, Res> = Box<dyn FnOnce(ArcHandler<Req, Res>) -> ArcHandler<Req, Res> + Send>;

/// Ordered strategy composition for one [`Circuit`].
pub struct CircuitBuilder<Req, Res> {
    layers: Vec<ApplyFn<Req, Res>>,
}

impl<Req, Res> CircuitBuilder<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add any strategy layer. Later additions wrap earlier ones.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<ArcHandler<Req, Res>, Service = ArcHandler<Req, Res>> + Send + 'static,
    {
        self.layers.push(Box::new(move |inner| layer.layer(inner)));
        self
    }

    /// Intercepting cache: serve hits without calling the dependency.
    pub fn caching(self, cache: Arc<dyn Cache<Req, Res>>) -> Self
    where
        Req: Clone + Eq + Hash,
        Res: Clone + Send + 'static,
    {
        self.layer(CachingLayer::new(cache))
    }

    /// Fallback cache: always call the dependency, serve the last good value
    /// when it fails.
    pub fn fallback_cache(self, cache: Arc<dyn Cache<Req, Res>>) -> Self
    where
        Req: Clone + Eq + Hash,
        Res: Clone + Send + 'static,
    {
        self.layer(CachingLayer::fallback(cache))
    }

    /// Reject calls beyond `max` simultaneously in flight.
    pub fn concurrency_limit(self, max: usize) -> Self {
        self.layer(ConcurrencyLimitLayer::new(max))
    }

    /// Open the circuit after `threshold` consecutive failures.
    pub fn consecutive_failures(self, threshold: usize) -> Self {
        self.layer(ConsecutiveFailuresLayer::new(threshold))
    }

    /// Reject calls immediately while the circuit is open.
    pub fn fast_fail(self) -> Self {
        self.layer(FastFailLayer::new())
    }

    /// Automatically close the circuit `ttl` after it opened.
    pub fn reclose_after(self, ttl: Duration) -> Self {
        self.layer(RecloseLayer::new(ttl))
    }

    /// Retry failed calls according to an interval policy.
    pub fn retry<P>(self, policy: P) -> Self
    where
        P: IntervalPolicy + 'static,
        Req: Clone,
    {
        self.layer(RetryLayer::new(policy))
    }

    /// Reject calls beyond `cap` within any sliding `period`.
    pub fn throttle(self, cap: usize, period: Duration) -> Self {
        self.layer(ThrottleLayer::new(cap, period))
    }

    /// Fail calls that do not complete within `window`.
    pub fn timeout(self, window: Duration) -> Self {
        self.layer(TimeoutLayer::new(window))
    }

    /// Fold the strategies into a circuit, innermost first.
    pub fn build(self) -> Circuit<Req, Res> {
        let mut pipeline: ArcHandler<Req, Res> = Arc::new(Passthrough);
        for apply in self.layers {
            pipeline = apply(pipeline);
        }
        Circuit::with_pipeline(pipeline)
    }
}

impl<Req, Res> Default for CircuitBuilder<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
