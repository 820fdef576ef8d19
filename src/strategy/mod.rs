//! Strategy decorators: one policy per layer, composed in caller order
//!
//! What this module provides (spec)
//! - Reusable guard policies that wrap a circuit's pipeline one behavior at a
//!   time
//!
//! Exports
//! - Layers
//!   - `CachingLayer` (intercept or fallback mode, pluggable `Cache`)
//!   - `ConcurrencyLimitLayer` (bounded in-flight count, no queuing)
//!   - `ConsecutiveFailuresLayer` (streak counter that trips the breaker)
//!   - `FastFailLayer` (load shedding while the circuit is open)
//!   - `RecloseLayer` (timed automatic reclose)
//!   - `RetryLayer` (fresh inward call per attempt, pluggable interval policy)
//!   - `ThrottleLayer` (sliding-window rate cap)
//!   - `TimeoutLayer` (bounded wait, uncancelled inner call)
//!
//! Implementation strategy
//! - Every layer implements `tower::Layer` over the boxed handler alias and
//!   produces that same alias, so layers fold into a single pipeline
//! - Private state (counters, timestamps, deadlines) is created inside
//!   `layer()`, so each application owns fresh state and nothing is shared
//!   across strategy instances
//! - Strategies re-raise failures they do not recognize; only caching and
//!   retry may convert a failure into a success
//!
//! Composition
//! - `CircuitBuilder::new().consecutive_failures(5).fast_fail().build()` or
//!   `circuit.apply(FastFailLayer::new())` incrementally
//! - The strategy applied last runs first on each call (LIFO)
//!
//! Testing strategy
//! - Scripted callees driven by atomic counters; assert call counts, state
//!   transitions, and rejection errors per strategy
//! - Integration tests compose full stacks and probe execution order

mod caching;
mod concurrency;
mod consecutive_failures;
mod fast_fail;
mod reclose;
mod retry;
mod throttle;
mod timeout;

pub use caching::CachingLayer;
pub use concurrency::ConcurrencyLimitLayer;
pub use consecutive_failures::ConsecutiveFailuresLayer;
pub use fast_fail::FastFailLayer;
pub use reclose::RecloseLayer;
pub use retry::RetryLayer;
pub use throttle::ThrottleLayer;
pub use timeout::TimeoutLayer;
