//! Demo server: one greeter service behind the dispatcher.

use std::path::PathBuf;

use clap::Parser;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use rpc_http_server::config::load_config;
use rpc_http_server::dispatch::{handler_fn, wrapper, HandlerFunc};
use rpc_http_server::observability::logging;
use rpc_http_server::{
    Context, EndpointMeta, EndpointTable, Handler, HandlerError, HttpServer, ServerConfig, StatusError,
};

#[derive(Debug, Parser)]
#[command(name = "rpc-http-server", version, about = "HTTP-to-RPC dispatch demo server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct HelloRequest {
    name: String,
    times: u32,
}

#[derive(Debug, Default, Serialize)]
struct HelloReply {
    message: String,
}

/// Upper bound on repeated greetings per call.
const MAX_TIMES: u32 = 10;

struct Greeter;

impl Greeter {
    fn hello<'a>(
        &'a self,
        ctx: &'a mut Context,
        req: HelloRequest,
        rsp: &'a mut HelloReply,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            if req.name.is_empty() {
                return Err(StatusError::bad_request("name is required").into());
            }
            let greeting = format!("Hello, {}!", req.name);
            rsp.message = vec![greeting; req.times.clamp(1, MAX_TIMES) as usize].join(" ");
            ctx.append_header("X-Greeter", "demo");
            Ok(())
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        register_rpc = config.dispatch.register_rpc,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let table = EndpointTable::from([(
        "Greeter.Hello".to_string(),
        EndpointMeta::new("GET,POST", "/v1/hello/{name}"),
    )]);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::builder(config)
        .handle(Handler::new(Greeter).method("Hello", Greeter::hello), &table)?
        .wrap(wrapper(log_calls))
        .build()?;

    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Logs each call with its outcome.
fn log_calls(next: HandlerFunc) -> HandlerFunc {
    handler_fn(move |ctx, req| {
        let next = next.clone();
        async move {
            let endpoint = req.endpoint().to_string();
            let reply = next(ctx, req).await;
            match &reply.result {
                Ok(_) => tracing::info!(endpoint = %endpoint, "Call served"),
                Err(e) => tracing::warn!(endpoint = %endpoint, error = %e, "Call failed"),
            }
            reply
        }
    })
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
