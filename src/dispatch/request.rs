//! Request descriptor handed to middleware and handlers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::metadata::Metadata;

/// Describes one RPC invocation.
///
/// `body` is the merged argument in JSON form, for middleware that logs,
/// validates or audits. The typed argument travels alongside it and is
/// consumed by the bound method.
pub struct RpcRequest {
    service: String,
    endpoint: String,
    content_type: String,
    header: Arc<Metadata>,
    body: Value,
    argument: Option<Box<dyn Any + Send>>,
}

impl RpcRequest {
    pub fn new(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        content_type: impl Into<String>,
        header: Arc<Metadata>,
        body: Value,
    ) -> Self {
        Self {
            service: service.into(),
            endpoint: endpoint.into(),
            content_type: content_type.into(),
            header,
            body,
            argument: None,
        }
    }

    /// Attach the typed argument.
    pub fn with_argument<A: Any + Send>(mut self, argument: A) -> Self {
        self.argument = Some(Box::new(argument));
        self
    }

    pub(crate) fn with_boxed_argument(mut self, argument: Box<dyn Any + Send>) -> Self {
        self.argument = Some(argument);
        self
    }

    /// Name of the server.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// `Service.Method`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Method part of the endpoint name.
    pub fn method(&self) -> &str {
        self.endpoint
            .rsplit_once('.')
            .map_or(self.endpoint.as_str(), |(_, m)| m)
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn header(&self) -> &Metadata {
        &self.header
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Typed argument, if it is an `A`.
    pub fn argument<A: Any>(&self) -> Option<&A> {
        self.argument.as_ref().and_then(|a| a.downcast_ref::<A>())
    }

    pub fn argument_mut<A: Any>(&mut self) -> Option<&mut A> {
        self.argument.as_mut().and_then(|a| a.downcast_mut::<A>())
    }

    /// Remove the typed argument. Returns `None` (and keeps it) when it is
    /// not an `A`.
    pub fn take_argument<A: Any>(&mut self) -> Option<A> {
        match self.argument.take()?.downcast::<A>() {
            Ok(a) => Some(*a),
            Err(other) => {
                self.argument = Some(other);
                None
            }
        }
    }
}

impl fmt::Debug for RpcRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcRequest")
            .field("service", &self.service)
            .field("endpoint", &self.endpoint)
            .field("content_type", &self.content_type)
            .field("body", &self.body)
            .field("argument", &self.argument.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> RpcRequest {
        RpcRequest::new(
            "items-api",
            "Items.Get",
            "application/json",
            Arc::new(Metadata::new()),
            json!({"id": "42"}),
        )
    }

    #[test]
    fn test_accessors() {
        let req = request();
        assert_eq!(req.service(), "items-api");
        assert_eq!(req.endpoint(), "Items.Get");
        assert_eq!(req.method(), "Get");
        assert_eq!(req.body()["id"], "42");
    }

    #[test]
    fn test_take_argument_checks_type() {
        let mut req = request().with_argument(7u32);
        assert_eq!(req.argument::<u32>(), Some(&7));
        assert!(req.take_argument::<String>().is_none());
        *req.argument_mut::<u32>().unwrap() += 1;
        assert_eq!(req.take_argument::<u32>(), Some(8));
        assert!(req.take_argument::<u32>().is_none());
    }
}
