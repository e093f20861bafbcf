//! # ctxchain
//!
//! Context-carrying middleware chains for synchronous HTTP handlers.
//!
//! A middleware is a function from the next [`Handler`] to a new one. A
//! [`Chain`] holds such constructors in order and folds them around a
//! terminal handler, first constructor outermost. Alongside the response
//! sink and the request, every layer receives an immutable [`Context`],
//! may derive a new one for the layers below, and hands one back up.
//!
//! What ctxchain does:
//!
//! - Composition: [`Chain`], non-mutating extension, reusable builds
//! - Context flow: [`Context`], a persistent key/value list
//! - Bridging: [`adapter::AddContext`], [`adapter::StripContext`], and
//!   [`middleware::legacy::wrap`] for middleware that knows nothing of contexts
//! - Hosting: a small hyper [`Server`] with graceful shutdown
//!
//! What it does not: routing, configuration, or any built-in middleware.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use ctxchain::{handler_fn, BoxHandler, Chain, Context, Handler, Request, ResponseWriter, Server};
//!
//! fn request_id(next: BoxHandler) -> impl Handler {
//!     handler_fn(move |ctx: Context, w: &mut ResponseWriter, req: &Request| {
//!         let id = req.header("x-request-id").unwrap_or("none").to_owned();
//!         next.serve(ctx.with_value("request_id", id), w, req)
//!     })
//! }
//!
//! fn hello(ctx: Context, w: &mut ResponseWriter, _req: &Request) -> Context {
//!     let id = ctx.value::<String>("request_id").map_or("?", String::as_str);
//!     w.write(format!("hello, request {id}\n").as_bytes());
//!     ctx
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Chain::new().append(request_id).then_host_fn(hello);
//!     Server::bind(([0, 0, 0, 0], 3000)).serve(app).await.unwrap();
//! }
//! ```

mod context;
mod error;
mod handler;
mod host;
mod request;
mod response;
mod server;

pub mod adapter;
pub mod middleware;

pub use context::Context;
pub use error::Error;
pub use handler::{handler_fn, BoxHandler, Handler, HandlerFn, Noop};
pub use host::{host_fn, BoxHostHandler, HostFn, HostHandler, NotFound};
pub use middleware::{BoxConstructor, Chain, Constructor};
pub use request::Request;
pub use response::ResponseWriter;
pub use server::Server;
