//! The host handler boundary.
//!
//! A [`HostHandler`] is what the server drives: it receives a response sink
//! and a request, and carries no [`Context`](crate::Context). Everything a
//! chain builds is ultimately exposed to the server through this trait via
//! [`AddContext`](crate::adapter::AddContext).

use std::sync::Arc;

use http::StatusCode;

use crate::request::Request;
use crate::response::ResponseWriter;

/// A context-less request handler, the unit the server understands.
///
/// Implement it on your own types, or lift a closure with [`host_fn`].
pub trait HostHandler: Send + Sync + 'static {
    fn serve(&self, w: &mut ResponseWriter, req: &Request);
}

/// A shared, type-erased [`HostHandler`].
pub type BoxHostHandler = Arc<dyn HostHandler>;

impl<H: HostHandler + ?Sized> HostHandler for Arc<H> {
    fn serve(&self, w: &mut ResponseWriter, req: &Request) {
        (**self).serve(w, req)
    }
}

impl<H: HostHandler + ?Sized> HostHandler for Box<H> {
    fn serve(&self, w: &mut ResponseWriter, req: &Request) {
        (**self).serve(w, req)
    }
}

// ── Function handlers ─────────────────────────────────────────────────────────

/// A [`HostHandler`] backed by a plain function. Created by [`host_fn`].
#[derive(Clone, Copy)]
pub struct HostFn<F>(F);

/// Lifts `f` into a [`HostHandler`].
///
/// ```rust
/// use ctxchain::{host_fn, HostHandler, Request, ResponseWriter};
///
/// let hello = host_fn(|w: &mut ResponseWriter, _req: &Request| w.write(b"hello"));
///
/// let mut w = ResponseWriter::new();
/// hello.serve(&mut w, &Request::get("/"));
/// assert_eq!(w.body(), b"hello");
/// ```
pub fn host_fn<F>(f: F) -> HostFn<F>
where
    F: Fn(&mut ResponseWriter, &Request) + Send + Sync + 'static,
{
    HostFn(f)
}

impl<F> HostHandler for HostFn<F>
where
    F: Fn(&mut ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn serve(&self, w: &mut ResponseWriter, req: &Request) {
        (self.0)(w, req)
    }
}

// ── Default handler ───────────────────────────────────────────────────────────

/// The host's fallback handler: answers every request with `404 Not Found`.
///
/// Used by [`Chain::then_host_default`](crate::Chain::then_host_default) when
/// no terminal handler is given. Stateless; the value is a constant.
#[derive(Clone, Copy, Debug, Default)]
pub struct NotFound;

impl HostHandler for NotFound {
    fn serve(&self, w: &mut ResponseWriter, _req: &Request) {
        w.set_status(StatusCode::NOT_FOUND);
        w.write(b"404 page not found\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_writes_404() {
        let mut w = ResponseWriter::new();
        NotFound.serve(&mut w, &Request::get("/missing"));
        assert_eq!(w.status(), StatusCode::NOT_FOUND);
        assert_eq!(w.body(), b"404 page not found\n");
    }

    #[test]
    fn boxed_handlers_forward() {
        let h: BoxHostHandler = Arc::new(host_fn(|w: &mut ResponseWriter, req: &Request| {
            w.write(req.path().as_bytes())
        }));
        let boxed: Box<dyn HostHandler> = Box::new(h.clone());

        let mut w = ResponseWriter::new();
        h.serve(&mut w, &Request::get("/a"));
        boxed.serve(&mut w, &Request::get("/b"));
        assert_eq!(w.body(), b"/a/b");
    }
}
