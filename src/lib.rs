//! # cutout
//!
//! A composable circuit breaker: a reusable guard placed in front of calls to
//! an unreliable dependency (a remote API, a query, any fallible async
//! operation) that tracks outcomes and can refuse further calls once the
//! dependency looks unhealthy.
//!
//! ## Core concepts
//!
//! - **Circuit**: the stateful guard for one logical dependency — an
//!   open/closed flag plus a composed call pipeline
//! - **Strategies**: independent policies (caching, concurrency limiting,
//!   consecutive-failure breaking, fast-fail, timed reclose, retry, throttle,
//!   timeout), each a [`tower::Layer`] wrapping the pipeline with one more
//!   behavior
//! - **Ordering**: the strategy applied last is outermost — it runs first on
//!   each call and last on the way back
//!
//! The callee itself stays opaque: any async function returning
//! `Result<Res, BoxError>` can be guarded, and its failures surface as
//! [`BreakerError::Dependency`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use cutout::{interval, CircuitBuilder};
//!
//! # async fn example() -> cutout::Result<()> {
//! // Open after 5 straight failures, shed load while open, reclose after
//! // 30s, and retry individual calls with a doubling backoff.
//! let circuit = CircuitBuilder::<String, String>::new()
//!     .retry(interval::doubling(Duration::from_millis(100), 4))
//!     .consecutive_failures(5)
//!     .fast_fail()
//!     .reclose_after(Duration::from_secs(30))
//!     .timeout(Duration::from_secs(2))
//!     .build();
//!
//! let body = circuit
//!     .invoke(|url: String| async move { fetch(url).await }, "https://example.com/health".into())
//!     .await?;
//! # Ok(())
//! # }
//! # async fn fetch(_url: String) -> Result<String, tower::BoxError> { Ok(String::new()) }
//! ```
//!
//! A circuit is meant to be a long-lived singleton per dependency; building a
//! fresh one per call throws away every learned signal (failure streaks,
//! cache contents, rate history).
//!
//! ## A caveat on timeouts
//!
//! [`TimeoutLayer`] abandons the inward call rather than cancelling it: a
//! timed-out call may still complete later with its side effects applied.
//! Only retry on timeout when the guarded operation is idempotent.

pub mod builder;
pub mod cache;
pub mod circuit;
pub mod error;
pub mod handler;
pub mod interval;
pub mod strategy;

pub use builder::CircuitBuilder;
pub use cache::{Cache, LruCache, MemoryCache};
pub use circuit::{Circuit, CircuitState};
pub use error::{BreakerError, Result};
pub use handler::{callee, ArcHandler, Callee, CalleeFuture, Handler, HandlerFuture, Passthrough};
pub use interval::IntervalPolicy;
pub use strategy::{
    CachingLayer, ConcurrencyLimitLayer, ConsecutiveFailuresLayer, FastFailLayer, RecloseLayer,
    RetryLayer, ThrottleLayer, TimeoutLayer,
};

// Re-export the Tower traits and error alias that appear in our public
// surface.
pub use tower::{BoxError, Layer};
