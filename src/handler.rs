//! The context-carrying handler abstraction.
//!
//! # Shape of a call
//!
//! Every layer of a chain, and the terminal handler inside it, implements
//! [`Handler`]:
//!
//! ```text
//! serve(ctx, w, req) -> ctx'
//!        │   │   │       └─ context handed back to the layer above
//!        │   │   └──────── the request, read-only
//!        │   └──────────── the response sink, written as a side effect
//!        └──────────────── context received from the layer above
//! ```
//!
//! There is no error channel. A handler that fails writes an error response
//! into `w`, or panics; the server turns a panic into a `500`.
//!
//! Composed handlers are stored as [`BoxHandler`] (`Arc<dyn Handler>`), so a
//! middleware holds its downstream as one shared pointer and a call costs one
//! virtual dispatch per layer.

use std::sync::Arc;

use crate::context::Context;
use crate::request::Request;
use crate::response::ResponseWriter;

/// A request handler that threads a [`Context`] through the call.
///
/// Implement it on your own types, or lift a closure with [`handler_fn`].
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, ctx: Context, w: &mut ResponseWriter, req: &Request) -> Context;
}

/// A shared, type-erased [`Handler`].
pub type BoxHandler = Arc<dyn Handler>;

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve(&self, ctx: Context, w: &mut ResponseWriter, req: &Request) -> Context {
        (**self).serve(ctx, w, req)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve(&self, ctx: Context, w: &mut ResponseWriter, req: &Request) -> Context {
        (**self).serve(ctx, w, req)
    }
}

// ── Function handlers ─────────────────────────────────────────────────────────

/// A [`Handler`] backed by a plain function. Created by [`handler_fn`].
#[derive(Clone, Copy)]
pub struct HandlerFn<F>(F);

/// Lifts `f` into a [`Handler`].
///
/// ```rust
/// use ctxchain::{handler_fn, Context, Handler, Request, ResponseWriter};
///
/// let h = handler_fn(|ctx: Context, w: &mut ResponseWriter, _req: &Request| {
///     w.write(b"h1\n");
///     ctx
/// });
///
/// let mut w = ResponseWriter::new();
/// h.serve(Context::background(), &mut w, &Request::get("/"));
/// assert_eq!(w.body(), b"h1\n");
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(Context, &mut ResponseWriter, &Request) -> Context + Send + Sync + 'static,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(Context, &mut ResponseWriter, &Request) -> Context + Send + Sync + 'static,
{
    fn serve(&self, ctx: Context, w: &mut ResponseWriter, req: &Request) -> Context {
        (self.0)(ctx, w, req)
    }
}

// ── No-op terminal ────────────────────────────────────────────────────────────

/// Terminal handler that writes nothing and returns its context unchanged.
///
/// Substituted by [`Chain::then_noop`](crate::Chain::then_noop).
#[derive(Clone, Copy, Debug, Default)]
pub struct Noop;

impl Handler for Noop {
    fn serve(&self, ctx: Context, _w: &mut ResponseWriter, _req: &Request) -> Context {
        ctx
    }
}
