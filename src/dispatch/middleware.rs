//! Handler wrappers and their composition.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use super::context::Context;
use super::error::HandlerError;
use super::request::RpcRequest;

/// Outcome of an invocation: the context (with whatever the chain wrote
/// into it) and the encoded reply or the application error.
#[derive(Debug)]
pub struct Reply {
    pub context: Context,
    pub result: Result<Value, HandlerError>,
}

impl Reply {
    pub fn ok(context: Context, value: Value) -> Self {
        Self {
            context,
            result: Ok(value),
        }
    }

    pub fn err(context: Context, error: impl Into<HandlerError>) -> Self {
        Self {
            context,
            result: Err(error.into()),
        }
    }
}

/// A uniform invocation function.
pub type HandlerFunc = Arc<dyn Fn(Context, RpcRequest) -> BoxFuture<'static, Reply> + Send + Sync>;

/// Transforms one invocation function into another of the same shape.
pub type HandlerWrapper = Arc<dyn Fn(HandlerFunc) -> HandlerFunc + Send + Sync>;

/// Build a [`HandlerFunc`] from an async closure.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFunc
where
    F: Fn(Context, RpcRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    Arc::new(move |ctx, req| f(ctx, req).boxed())
}

/// Build a [`HandlerWrapper`] from a closure.
pub fn wrapper<F>(f: F) -> HandlerWrapper
where
    F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered wrapper list, fixed once the server is built.
///
/// The first registered wrapper is the outermost: it sees the request
/// first and the reply last.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    wrappers: Arc<[HandlerWrapper]>,
}

impl MiddlewareChain {
    pub fn new(wrappers: Vec<HandlerWrapper>) -> Self {
        Self {
            wrappers: wrappers.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// Wrap `inner` with every wrapper.
    pub fn wrap(&self, inner: HandlerFunc) -> HandlerFunc {
        self.wrappers
            .iter()
            .rev()
            .fold(inner, |next, wrapper| wrapper(next))
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.wrappers.len())
            .finish()
    }
}
