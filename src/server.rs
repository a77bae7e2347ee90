//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_util::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::envelope::Envelope;
use crate::error::{ApiError, Error};
use crate::method::Method;
use crate::middleware::{trace, Cors};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;
use crate::status::Status;

enum Bind {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    bind: Bind,
    cors: Option<Cors>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use garage::Server;
    /// let server = Server::bind(([127, 0, 0, 1], 8080).into());
    /// ```
    pub fn bind(addr: SocketAddr) -> Self {
        Self { bind: Bind::Addr(addr), cors: None }
    }

    /// Serves on an already bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener), cors: None }
    }

    /// Decorates every response with the permissive CORS headers and answers
    /// `OPTIONS` preflight requests when `enabled`.
    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors = enabled.then(Cors::permissive);
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve<S>(self, router: Router<S>) -> Result<(), Error>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops when `signal` resolves.
    pub async fn serve_with_shutdown<S>(
        self,
        router: Router<S>,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error>
    where
        S: Clone + Send + Sync + 'static,
    {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };
        let addr = listener.local_addr()?;

        let router = Arc::new(router);
        let cors = Arc::new(self.cors);

        info!(%addr, "garage listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting at once,
                // even if more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let cors = Arc::clone(&cors);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            let cors = Arc::clone(&cors);
                            async move { handle(router, cors, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("garage stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Parses one hyper request, routes it, and produces one response.
///
/// The error type is [`Infallible`]: every failure, a panicking handler
/// included, is answered with a status code so hyper never sees an error.
async fn handle<S>(
    router: Arc<Router<S>>,
    cors: Arc<Option<Cors>>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    S: Clone + Send + Sync + 'static,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_owned();
    let method = parts.method.as_str().parse::<Method>().ok();

    let response = match method {
        None => ApiError::MethodNotAllowed.into_response(),
        // Preflight: answered here, the CORS headers are added below.
        Some(Method::Options) if cors.is_some() && !router.allows(Method::Options) => {
            Response::status(Status::NoContent)
        }
        Some(method) => match body.collect().await {
            Ok(collected) => {
                let target = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
                let headers = parts.headers.iter()
                    .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
                    .collect();
                let request = Request::parse(method, target, headers, collected.to_bytes()).await;

                AssertUnwindSafe(router.dispatch(request))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        error!(%method, path = %path, "handler panicked");
                        Envelope::error("Internal Server Error").respond(Status::InternalServerError)
                    })
            }
            Err(e) => ApiError::BadRequest(format!("Unreadable request body: {e}")).into_response(),
        },
    };

    let response = match &*cors {
        Some(cors) => cors.apply(response),
        None => response,
    };

    trace::record(method, &path, response.status_code(), started.elapsed());
    Ok(response.into_hyper())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A signal that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => { stream.recv().await; }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` never resolves, so on non-Unix platforms the SIGTERM arm
    // is effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
