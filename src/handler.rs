//! Pipeline currency: the handler trait, the callee, and the pass-through
//!
//! A circuit's pipeline is a chain of [`Handler`]s, each wrapping the next,
//! with [`Passthrough`] innermost. Every handler receives the circuit's
//! shared [`CircuitState`] (so strategies can read or flip the open/closed
//! flag) and the [`Callee`] being guarded, and returns a `'static` boxed
//! future so strategies are free to move the call onto another task.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tower::BoxError;

use crate::circuit::CircuitState;
use crate::error::{BreakerError, Result};

/// Future returned by a [`Callee`].
pub type CalleeFuture<Res> = BoxFuture<'static, std::result::Result<Res, BoxError>>;

/// The guarded dependency call: an opaque async function from request to
/// result. The circuit never inspects its semantics.
pub type Callee<Req, Res> = Arc<dyn Fn(Req) -> CalleeFuture<Res> + Send + Sync>;

/// Future returned by a [`Handler`].
pub type HandlerFuture<Res> = BoxFuture<'static, Result<Res>>;

/// Wrap an async closure into a [`Callee`].
pub fn callee<Req, Res, F, Fut>(f: F) -> Callee<Req, Res>
where
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Res, BoxError>> + Send + 'static,
{
    Arc::new(move |req| -> CalleeFuture<Res> { Box::pin(f(req)) })
}

/// One link in a circuit's call pipeline.
///
/// Handlers nest: the outermost handler runs first on each call and last on
/// the way back. A handler may inspect or mutate the circuit flag, delegate
/// inward, and process the inward outcome before returning it.
pub trait Handler<Req, Res>: Send + Sync {
    fn call(
        &self,
        state: Arc<CircuitState>,
        callee: Callee<Req, Res>,
        req: Req,
    ) -> HandlerFuture<Res>;
}

/// Shared, immutable handle to a pipeline link.
pub type ArcHandler<Req, Res> = Arc<dyn Handler<Req, Res>>;

/// The innermost handler: invokes the callee and wraps its failure in
/// [`BreakerError::Dependency`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl<Req, Res> Handler<Req, Res> for Passthrough
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn call(
        &self,
        _state: Arc<CircuitState>,
        callee: Callee<Req, Res>,
        req: Req,
    ) -> HandlerFuture<Res> {
        Box::pin(async move { callee(req).await.map_err(BreakerError::Dependency) })
    }
}
