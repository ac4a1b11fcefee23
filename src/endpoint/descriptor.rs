//! Typed method registration and its type-erased form.

use std::any::{self, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::dispatch::{Context, HandlerError, HandlerFunc, Reply, RpcRequest};
use crate::merge::{self, FlatParams, MergeError, MergeOptions};

/// Signature of a bindable method.
///
/// ```ignore
/// impl Items {
///     fn get<'a>(
///         &'a self,
///         ctx: &'a mut Context,
///         req: GetRequest,
///         rsp: &'a mut GetReply,
///     ) -> BoxFuture<'a, Result<(), HandlerError>> {
///         Box::pin(async move { /* fill rsp */ Ok(()) })
///     }
/// }
/// ```
pub type MethodFn<S, A, R> =
    for<'a> fn(&'a S, &'a mut Context, A, &'a mut R) -> BoxFuture<'a, Result<(), HandlerError>>;

/// A decoded argument: JSON view for middleware plus the typed value.
pub struct Argument {
    pub value: Value,
    pub(crate) typed: Box<dyn Any + Send>,
}

/// Type-erased binding of one method.
pub trait Invoke: Send + Sync {
    fn argument_type(&self) -> &'static str;

    fn reply_type(&self) -> &'static str;

    /// Build the argument from the decoded body and request parameters.
    ///
    /// Starts from the argument type's default, overlays the body, then
    /// merges the parameters.
    fn prepare(
        &self,
        body: Option<Value>,
        params: &FlatParams,
        options: &MergeOptions,
    ) -> Result<Argument, MergeError>;

    /// Invocation function calling the bound method.
    fn handler(&self) -> HandlerFunc;
}

struct Bound<S, A, R> {
    receiver: Arc<S>,
    method: MethodFn<S, A, R>,
    _types: PhantomData<fn() -> (A, R)>,
}

impl<S, A, R> Invoke for Bound<S, A, R>
where
    S: Send + Sync + 'static,
    A: DeserializeOwned + Serialize + Default + Send + 'static,
    R: Serialize + Default + Send + 'static,
{
    fn argument_type(&self) -> &'static str {
        any::type_name::<A>()
    }

    fn reply_type(&self) -> &'static str {
        any::type_name::<R>()
    }

    fn prepare(
        &self,
        body: Option<Value>,
        params: &FlatParams,
        options: &MergeOptions,
    ) -> Result<Argument, MergeError> {
        let mut value = serde_json::to_value(A::default())?;
        if let Some(body) = body {
            merge::overlay(&mut value, body);
        }
        merge::merge(&mut value, params, options)?;
        let typed: A = merge::from_value(value)?;
        Ok(Argument {
            value: serde_json::to_value(&typed)?,
            typed: Box::new(typed),
        })
    }

    fn handler(&self) -> HandlerFunc {
        let receiver = Arc::clone(&self.receiver);
        let method = self.method;
        Arc::new(move |mut ctx: Context, mut req: RpcRequest| {
            let receiver = Arc::clone(&receiver);
            Box::pin(async move {
                let Some(argument) = req.take_argument::<A>() else {
                    return Reply::err(
                        ctx,
                        HandlerError::other(format!(
                            "argument for {} is not a {}",
                            req.endpoint(),
                            any::type_name::<A>()
                        )),
                    );
                };
                let mut reply = R::default();
                let result = match method(&receiver, &mut ctx, argument, &mut reply).await {
                    Ok(()) => serde_json::to_value(&reply).map_err(HandlerError::other),
                    Err(e) => Err(e),
                };
                Reply {
                    context: ctx,
                    result,
                }
            })
        })
    }
}

/// A receiver and its bindable methods.
pub struct Handler<S> {
    name: String,
    receiver: Arc<S>,
    methods: BTreeMap<String, Arc<dyn Invoke>>,
}

impl<S: Send + Sync + 'static> Handler<S> {
    /// Named after the receiver type (`Items` for `my_crate::api::Items`).
    pub fn new(receiver: S) -> Self {
        Self::from_arc(Arc::new(receiver))
    }

    pub fn from_arc(receiver: Arc<S>) -> Self {
        Self {
            name: short_type_name::<S>().to_string(),
            receiver,
            methods: BTreeMap::new(),
        }
    }

    /// Override the service name used for endpoint names and the RPC alias.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register `method` under `name`.
    pub fn method<A, R>(mut self, name: &str, method: MethodFn<S, A, R>) -> Self
    where
        A: DeserializeOwned + Serialize + Default + Send + 'static,
        R: Serialize + Default + Send + 'static,
    {
        let bound = Bound {
            receiver: Arc::clone(&self.receiver),
            method,
            _types: PhantomData,
        };
        self.methods.insert(name.to_string(), Arc::new(bound));
        self
    }
}

impl<S> Handler<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn lookup(&self, method: &str) -> Option<Arc<dyn Invoke>> {
        self.methods.get(method).cloned()
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

/// Strip module path and generic arguments from a type name.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A bound endpoint. Built once, shared read-only.
#[derive(Clone)]
pub struct EndpointDescriptor {
    pub service: String,
    pub method: String,
    pub argument_type: &'static str,
    pub reply_type: &'static str,
    pub invoker: Arc<dyn Invoke>,
}

impl EndpointDescriptor {
    /// `Service.Method`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.service, self.method)
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("service", &self.service)
            .field("method", &self.method)
            .field("argument_type", &self.argument_type)
            .field("reply_type", &self.reply_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct EchoRequest {
        id: u32,
        tags: Vec<String>,
    }

    #[derive(Debug, Default, Serialize)]
    struct EchoReply {
        id: u32,
        count: usize,
    }

    struct Echo<T>(PhantomData<T>);

    struct Plain;

    impl Plain {
        fn echo<'a>(
            &'a self,
            ctx: &'a mut Context,
            req: EchoRequest,
            rsp: &'a mut EchoReply,
        ) -> BoxFuture<'a, Result<(), HandlerError>> {
            Box::pin(async move {
                ctx.append_header("X-Echo", req.id.to_string());
                rsp.id = req.id;
                rsp.count = req.tags.len();
                Ok(())
            })
        }
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Plain>(), "Plain");
        assert_eq!(short_type_name::<Echo<String>>(), "Echo");
        assert_eq!(Handler::new(Plain).name(), "Plain");
        assert_eq!(Handler::new(Plain).with_name("Api").name(), "Api");
    }

    #[test]
    fn test_prepare_merges_body_and_params() {
        let handler = Handler::new(Plain).method("Echo", Plain::echo);
        let invoker = handler.lookup("Echo").unwrap();
        assert!(invoker.argument_type().ends_with("EchoRequest"));

        let params: FlatParams = [("id", "7"), ("tags", "b")].into_iter().collect();
        let argument = invoker
            .prepare(Some(json!({"tags": ["a"]})), &params, &MergeOptions::default())
            .unwrap();
        assert_eq!(argument.value, json!({"id": 7, "tags": ["a", "b"]}));
    }

    #[tokio::test]
    async fn test_handler_invokes_method() {
        let handler = Handler::new(Plain).method("Echo", Plain::echo);
        let invoker = handler.lookup("Echo").unwrap();
        let argument = invoker
            .prepare(Some(json!({"id": 3, "tags": ["x", "y"]})), &FlatParams::new(), &MergeOptions::default())
            .unwrap();
        let request = RpcRequest::new(
            "test",
            "Plain.Echo",
            "application/json",
            Arc::new(Metadata::new()),
            argument.value,
        )
        .with_boxed_argument(argument.typed);

        let reply = invoker.handler()(Context::default(), request).await;
        assert_eq!(reply.result.unwrap(), json!({"id": 3, "count": 2}));
        assert_eq!(reply.context.response().header("X-Echo"), ["3"]);
    }

    #[tokio::test]
    async fn test_handler_rejects_missing_argument() {
        let handler = Handler::new(Plain).method("Echo", Plain::echo);
        let request = RpcRequest::new("test", "Plain.Echo", "application/json", Arc::new(Metadata::new()), json!({}));
        let reply = handler.lookup("Echo").unwrap().handler()(Context::default(), request).await;
        assert!(matches!(reply.result, Err(HandlerError::Other(_))));
    }
}
