//! HTTP server and graceful shutdown.
//!
//! The server is the host that composed chains run inside. For every request
//! it buffers the body, hands a [`Request`] and a fresh [`ResponseWriter`] to
//! the [`HostHandler`], and sends whatever the handler wrote.
//!
//! Handlers are synchronous, so each call runs on tokio's blocking pool:
//! one blocking task per request, requests in parallel, the layers of one
//! chain strictly in sequence. A handler that panics costs its own request a
//! `500`; the connection task and the server keep going.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C (or the future passed to
//! [`Server::serve_with_shutdown`]) the server:
//! 1. Stops `listener.accept()`, so no new connections are made.
//! 2. Tells every open connection to finish its current request and close;
//!    idle keep-alive connections close at once.
//! 3. Returns from `serve` once the last connection is gone.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::Error;
use crate::host::{BoxHostHandler, HostHandler};
use crate::request::Request;
use crate::response::ResponseWriter;

/// The HTTP server.
pub struct Server {
    listener: Listener,
}

enum Listener {
    Addr(SocketAddr),
    Bound(TcpListener),
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use ctxchain::Server;
    /// let server = Server::bind(([0, 0, 0, 0], 3000));
    /// ```
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { listener: Listener::Addr(addr.into()) }
    }

    /// Serves on an already bound listener, e.g. one on port `0`.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listener: Listener::Bound(listener) }
    }

    /// The address the server listens on, or will listen on.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        match &self.listener {
            Listener::Addr(addr) => Ok(*addr),
            Listener::Bound(listener) => Ok(listener.local_addr()?),
        }
    }

    /// Starts accepting connections and dispatching them to `handler`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, handler: impl HostHandler) -> Result<(), Error> {
        self.serve_with_shutdown(handler, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting once `signal`
    /// resolves instead of waiting for a process signal.
    pub async fn serve_with_shutdown<F>(self, handler: impl HostHandler, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let listener = match self.listener {
            Listener::Addr(addr) => TcpListener::bind(addr).await?,
            Listener::Bound(listener) => listener,
        };
        let handler: BoxHostHandler = Arc::new(handler);

        info!(addr = %listener.local_addr()?, "ctxchain listening");

        let mut tasks = tokio::task::JoinSet::new();
        // Flips once the accept loop ends; every connection task watches it.
        let (drain_tx, drain_rx) = watch::channel(());

        tokio::pin!(signal);

        loop {
            tokio::select! {
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

                    let handler = Arc::clone(&handler);
                    let drain = drain_rx.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(serve_connection(io, handler, remote_addr, drain));
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        let _ = drain_tx.send(());
        while tasks.join_next().await.is_some() {}

        info!("ctxchain stopped");
        Ok(())
    }
}

// ── Connections ───────────────────────────────────────────────────────────────

/// Drives one connection until the peer closes it or the server drains.
///
/// On drain, hyper finishes the request in flight (if any) and then closes
/// the connection, so idle keep-alive clients cannot hold shutdown open.
async fn serve_connection(
    io: TokioIo<TcpStream>,
    handler: BoxHostHandler,
    remote_addr: SocketAddr,
    mut drain: watch::Receiver<()>,
) {
    // Called once per request on the connection.
    let svc = service_fn(move |req| {
        let handler = Arc::clone(&handler);
        async move { dispatch(handler, req, remote_addr).await }
    });

    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(io, svc);
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(e) = res {
                    error!(peer = %remote_addr, "connection error: {e}");
                }
                break;
            }

            _ = drain.changed(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through `handler` and produces one response.
///
/// Never fails towards hyper: unreadable bodies become `400`, panicking
/// handlers `500`.
async fn dispatch(
    handler: BoxHostHandler,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(status_only(StatusCode::BAD_REQUEST));
        }
    };

    let req = Request::new(http::Request::from_parts(parts, body));
    let path = req.path().to_owned();

    let served = tokio::task::spawn_blocking(move || {
        let mut w = ResponseWriter::new();
        handler.serve(&mut w, &req);
        w
    })
    .await;

    match served {
        Ok(w) => Ok(w.into_response()),
        Err(e) => {
            error!(peer = %remote_addr, %path, "handler failed: {e}");
            Ok(status_only(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

fn status_only(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut w = ResponseWriter::new();
    w.set_status(status);
    w.into_response()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A signal that cannot be installed
/// is logged and never fires.
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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
