//! Minimal ctxchain example: a request-id layer, a legacy logging layer, and a
//! terminal handler reading the context.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -H 'x-request-id: 42' http://localhost:3000/hello
//!   curl http://localhost:3000/admin

use std::fmt::Write;
use std::time::Instant;

use ctxchain::middleware::legacy;
use ctxchain::{
    handler_fn, host_fn, BoxHandler, BoxHostHandler, Chain, Context, Handler, HostHandler, Request,
    ResponseWriter, Server,
};
use http::StatusCode;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let base = Chain::new()
        .append(legacy::wrap(timing))
        .append(request_id);

    // Extending returns a new chain; `base` stays as it was.
    let guarded = base.append(deny_admin);

    let app = guarded.then_host_fn(hello);

    if let Err(e) = Server::bind(([0, 0, 0, 0], 3000)).serve(app).await {
        eprintln!("server error: {e}");
    }
}

// Knows nothing about contexts; reused as-is through `legacy::wrap`.
fn timing(next: BoxHostHandler) -> impl HostHandler {
    host_fn(move |w: &mut ResponseWriter, req: &Request| {
        let start = Instant::now();
        next.serve(w, req);
        tracing::info!(path = req.path(), status = w.status().as_u16(), elapsed = ?start.elapsed(), "served");
    })
}

fn request_id(next: BoxHandler) -> impl Handler {
    handler_fn(move |ctx: Context, w: &mut ResponseWriter, req: &Request| {
        let id = req.header("x-request-id").unwrap_or("anonymous").to_owned();
        next.serve(ctx.with_value("request_id", id), w, req)
    })
}

// Short-circuits: `/admin` never reaches the terminal handler.
fn deny_admin(next: BoxHandler) -> impl Handler {
    handler_fn(move |ctx: Context, w: &mut ResponseWriter, req: &Request| {
        if req.path().starts_with("/admin") {
            w.set_status(StatusCode::FORBIDDEN);
            w.write(b"forbidden\n");
            return ctx;
        }
        next.serve(ctx, w, req)
    })
}

fn hello(ctx: Context, w: &mut ResponseWriter, req: &Request) -> Context {
    let id = ctx.value::<String>("request_id").map_or("?", String::as_str);
    let _ = writeln!(w, "hello from {} (request {id})", req.path());
    ctx
}
