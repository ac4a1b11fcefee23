//! Shared services and helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

use rpc_http_server::endpoint::BindError;
use rpc_http_server::http::ServerBuilder;
use rpc_http_server::{
    Context, EndpointMeta, EndpointTable, Handler, HandlerError, HttpServer, ServerConfig, StatusError,
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdRequest {
    pub id: String,
    pub verbose: bool,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub id: String,
    pub verbose: bool,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListRequest {
    pub page_size: u32,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListReply {
    pub page_size: u32,
    pub tags: Vec<String>,
}

/// Item service. Special ids trigger the error and response-state paths.
#[derive(Default)]
pub struct Items {
    pub calls: Arc<AtomicUsize>,
}

impl Items {
    pub fn get<'a>(
        &'a self,
        ctx: &'a mut Context,
        req: IdRequest,
        rsp: &'a mut Item,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match req.id.as_str() {
                "missing" => return Err(StatusError::not_found("not found").into()),
                "wrapped" => return Err(HandlerError::wrap(&json!({"reason": "quota"}))),
                "boom" => return Err(HandlerError::other("boom")),
                "teapot" => ctx.set_status(StatusCode::IM_A_TEAPOT),
                "form" => ctx
                    .outgoing_mut()
                    .set("Content-Type", "application/x-www-form-urlencoded"),
                "xml" => ctx.append_header("Content-Type", "application/xml"),
                _ => {}
            }
            ctx.outgoing_mut().set("X-Item-Id", req.id.clone());
            ctx.append_header("Set-Cookie", "seen=1");
            ctx.append_header("Set-Cookie", "theme=dark");

            rsp.id = req.id;
            rsp.verbose = req.verbose;
            rsp.tags = req.tags;
            rsp.remote = ctx.incoming().get("RemoteAddr").unwrap_or_default().to_string();
            Ok(())
        })
    }

    pub fn list<'a>(
        &'a self,
        _ctx: &'a mut Context,
        req: ListRequest,
        rsp: &'a mut ListReply,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            rsp.page_size = req.page_size;
            rsp.tags = req.tags;
            Ok(())
        })
    }

    pub fn search<'a>(
        &'a self,
        _ctx: &'a mut Context,
        req: SearchRequest,
        rsp: &'a mut SearchRequest,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            *rsp = req;
            Ok(())
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HelloRequest {
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HelloReply {
    pub message: String,
}

pub struct Greeter;

impl Greeter {
    pub fn hello<'a>(
        &'a self,
        _ctx: &'a mut Context,
        req: HelloRequest,
        rsp: &'a mut HelloReply,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            rsp.message = format!("Hello {}", req.name);
            Ok(())
        })
    }
}

pub fn items_table() -> EndpointTable {
    EndpointTable::from([
        ("Items.Get".to_string(), EndpointMeta::new("GET", "/items/{id}")),
        ("Items.Create".to_string(), EndpointMeta::new("POST", "/items")),
        ("Items.List".to_string(), EndpointMeta::new("GET", "/items")),
        ("Items.Search".to_string(), EndpointMeta::new("GET", "/search")),
    ])
}

pub fn greeter_table() -> EndpointTable {
    EndpointTable::from([(
        "Greeter.Hello".to_string(),
        EndpointMeta::new("GET", "/v1/hello/{name}"),
    )])
}

/// Builder with the item and greeter services bound. The returned counter
/// tracks item calls.
pub fn builder(config: ServerConfig) -> Result<(ServerBuilder, Arc<AtomicUsize>), BindError> {
    let items = Items::default();
    let calls = Arc::clone(&items.calls);
    let items = Handler::new(items)
        .method("Get", Items::get)
        .method("Create", Items::get)
        .method("List", Items::list)
        .method("Search", Items::search);
    let builder = HttpServer::builder(config)
        .handle(items, &items_table())?
        .handle(Handler::new(Greeter).method("Hello", Greeter::hello), &greeter_table())?;
    Ok((builder, calls))
}

pub fn server(config: ServerConfig) -> (HttpServer, Arc<AtomicUsize>) {
    let (builder, calls) = builder(config).unwrap();
    (builder.build().unwrap(), calls)
}

pub struct Captured {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Drive one request through the server's router.
pub async fn call(server: &HttpServer, request: Request<Body>) -> Captured {
    let response = server.router().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    Captured {
        status,
        headers,
        body,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Serve on an ephemeral port. Dropping the sender stops the server.
pub async fn spawn(server: HttpServer) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        server
            .run(listener, async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    (addr, tx)
}
