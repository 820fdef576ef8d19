//! Caching: memoize successes, optionally serve them instead of the callee
//!
//! Two modes, chosen at construction:
//!
//! - **intercept** (default): consult the cache before delegating. A hit is
//!   returned without running the callee at all; a miss delegates inward and
//!   stores the successful result. Failures propagate unmodified and are
//!   never cached.
//! - **fallback**: always delegate first. Successes are stored and returned;
//!   on failure a previously stored value, if any, is returned instead and
//!   the failure is swallowed. With nothing stored the failure propagates.
//!
//! Keys are the call's request value. The cache is mutated on every
//! successful call and on every served hit (hit bookkeeping), which is what
//! lets LRU/LFU-style eviction live entirely inside the cache implementation.

use std::hash::Hash;
use std::sync::Arc;

use tower::Layer;
use tracing::debug;

use crate::cache::Cache;
use crate::circuit::CircuitState;
use crate::handler::{ArcHandler, Callee, Handler, HandlerFuture};

/// Strategy factory for caching.
pub struct CachingLayer<Req, Res> {
    cache: Arc<dyn Cache<Req, Res>>,
    intercept: bool,
}

impl<Req, Res> CachingLayer<Req, Res> {
    /// Intercepting cache: hits skip the callee entirely.
    pub fn new(cache: Arc<dyn Cache<Req, Res>>) -> Self {
        Self {
            cache,
            intercept: true,
        }
    }

    /// Fallback cache: the callee always runs; the cache covers its failures.
    pub fn fallback(cache: Arc<dyn Cache<Req, Res>>) -> Self {
        Self {
            cache,
            intercept: false,
        }
    }
}

impl<Req, Res> Clone for CachingLayer<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            intercept: self.intercept,
        }
    }
}

impl<Req, Res> Layer<ArcHandler<Req, Res>> for CachingLayer<Req, Res>
where
    Req: Clone + Eq + Hash + Send + 'static,
    Res: Clone + Send + 'static,
{
    type Service = ArcHandler<Req, Res>;

    fn layer(&self, inner: ArcHandler<Req, Res>) -> Self::Service {
        Arc::new(Caching {
            inner,
            cache: Arc::clone(&self.cache),
            intercept: self.intercept,
        })
    }
}

struct Caching<Req, Res> {
    inner: ArcHandler<Req, Res>,
    cache: Arc<dyn Cache<Req, Res>>,
    intercept: bool,
}

impl<Req, Res> Handler<Req, Res> for Caching<Req, Res>
where
    Req: Clone + Eq + Hash + Send + 'static,
    Res: Clone + Send + 'static,
{
    fn call(
        &self,
        state: Arc<CircuitState>,
        callee: Callee<Req, Res>,
        req: Req,
    ) -> HandlerFuture<Res> {
        let inner = Arc::clone(&self.inner);
        let cache = Arc::clone(&self.cache);
        let intercept = self.intercept;
        Box::pin(async move {
            if intercept {
                if cache.has(&req) {
                    if let Some(value) = cache.get(&req) {
                        debug!("cache hit, skipping call");
                        cache.record_hit(&req);
                        return Ok(value);
                    }
                }
                let value = inner.call(state, callee, req.clone()).await?;
                cache.record_miss(req, value.clone());
                Ok(value)
            } else {
                match inner.call(state, callee, req.clone()).await {
                    Ok(value) => {
                        cache.record_miss(req, value.clone());
                        Ok(value)
                    }
                    Err(err) => match cache.get(&req) {
                        Some(value) => {
                            debug!("serving cached value after failure: {}", err);
                            cache.record_hit(&req);
                            Ok(value)
                        }
                        None => Err(err),
                    },
                }
            }
        })
    }
}
