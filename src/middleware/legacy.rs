//! Running context-less middleware inside a chain.
//!
//! A legacy middleware only knows [`HostHandler`]s: it takes the next host
//! handler and returns one wrapping it. To place it in a [`Chain`](super::Chain)
//! without breaking the context flow, [`wrap`] runs it per request against a
//! shim:
//!
//! ```text
//! Legacy::serve(ctx, w, req)
//!   ├─ slot  = OnceLock::new()
//!   ├─ shim  = HostShim { next, ctx, slot }      ← a HostHandler
//!   ├─ legacy(shim).serve(w, req)
//!   │     └─ shim.serve(w, req)
//!   │           └─ slot.set(next.serve(ctx, w, req))
//!   └─ slot.get() or the incoming ctx
//! ```
//!
//! The slot is write-once. Should the legacy middleware call the shim more
//! than once, the first downstream context is kept. Should it never call the
//! shim (a short-circuit), the incoming context is returned unchanged.

use std::sync::{Arc, OnceLock};

use tracing::trace;

use crate::context::Context;
use crate::handler::{BoxHandler, Handler};
use crate::host::{BoxHostHandler, HostHandler};
use crate::request::Request;
use crate::response::ResponseWriter;

use super::Constructor;

/// Lifts a context-less middleware into a [`Constructor`].
///
/// ```rust
/// use ctxchain::middleware::legacy;
/// use ctxchain::{host_fn, BoxHostHandler, Chain, HostHandler, Request, ResponseWriter};
///
/// fn banner(next: BoxHostHandler) -> impl HostHandler {
///     host_fn(move |w: &mut ResponseWriter, req: &Request| {
///         w.write(b"== ");
///         next.serve(w, req);
///     })
/// }
///
/// let chain = Chain::new().append(legacy::wrap(banner));
/// # let _ = chain;
/// ```
pub fn wrap<L, H>(legacy: L) -> impl Constructor
where
    L: Fn(BoxHostHandler) -> H + Send + Sync + 'static,
    H: HostHandler,
{
    let legacy = Arc::new(legacy);
    move |next: BoxHandler| Legacy {
        next,
        legacy: Arc::clone(&legacy),
    }
}

/// The context-carrying handler [`wrap`] builds around each downstream.
struct Legacy<L> {
    next: BoxHandler,
    legacy: Arc<L>,
}

impl<L, H> Handler for Legacy<L>
where
    L: Fn(BoxHostHandler) -> H + Send + Sync + 'static,
    H: HostHandler,
{
    fn serve(&self, ctx: Context, w: &mut ResponseWriter, req: &Request) -> Context {
        let slot = Arc::new(OnceLock::new());
        let shim: BoxHostHandler = Arc::new(HostShim {
            next: Arc::clone(&self.next),
            ctx: ctx.clone(),
            slot: Arc::clone(&slot),
        });

        (self.legacy)(shim).serve(w, req);

        match slot.get() {
            Some(downstream) => downstream.clone(),
            None => {
                trace!(path = req.path(), "legacy middleware short-circuited; keeping incoming context");
                ctx
            }
        }
    }
}

/// Host handler handed to the legacy middleware in place of its `next`.
struct HostShim {
    next: BoxHandler,
    ctx: Context,
    slot: Arc<OnceLock<Context>>,
}

impl HostHandler for HostShim {
    fn serve(&self, w: &mut ResponseWriter, req: &Request) {
        let out = self.next.serve(self.ctx.clone(), w, req);
        if self.slot.set(out).is_err() {
            trace!(path = req.path(), "downstream served twice; keeping first context");
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::handler::handler_fn;
    use crate::host::host_fn;
    use crate::middleware::Chain;

    fn append(ctx: &Context, s: &str) -> Context {
        let prev = ctx.value::<String>("test").cloned().unwrap_or_default();
        ctx.with_value("test", prev + s)
    }

    fn terminal(ctx: Context, w: &mut ResponseWriter, _req: &Request) -> Context {
        w.write(b"h0-");
        append(&ctx, "h0-")
    }

    fn serve(h: &dyn Handler) -> (Context, ResponseWriter) {
        let mut w = ResponseWriter::new();
        let ctx = h.serve(Context::background(), &mut w, &Request::get("/"));
        (ctx, w)
    }

    #[test]
    fn passes_downstream_context_back_up() {
        let chain = Chain::new().append(wrap(|next: BoxHostHandler| {
            host_fn(move |w: &mut ResponseWriter, req: &Request| {
                w.write(b"m0-");
                next.serve(w, req);
            })
        }));

        let (ctx, w) = serve(&*chain.then_fn(terminal));

        assert_eq!(w.body(), b"m0-h0-");
        assert_eq!(ctx.value::<String>("test").map(String::as_str), Some("h0-"));
    }

    #[test]
    fn outer_context_reaches_downstream() {
        let chain = Chain::new()
            .append(|next: BoxHandler| {
                handler_fn(move |ctx: Context, w: &mut ResponseWriter, req: &Request| {
                    next.serve(ctx.with_value("id", 10_u32), w, req)
                })
            })
            .append(wrap(|next: BoxHostHandler| next));

        let (ctx, w) = serve(&*chain.then_fn(|ctx: Context, w: &mut ResponseWriter, _req: &Request| {
            let id = ctx.value::<u32>("id").copied().unwrap_or_default();
            w.write(format!("{id}").as_bytes());
            ctx
        }));

        assert_eq!(w.body(), b"10");
        assert_eq!(ctx.value::<u32>("id"), Some(&10));
    }

    #[test]
    fn short_circuit_keeps_incoming_context() {
        let chain = Chain::new()
            .append(|next: BoxHandler| {
                handler_fn(move |ctx: Context, w: &mut ResponseWriter, req: &Request| {
                    next.serve(append(&ctx, "b0-"), w, req)
                })
            })
            .append(wrap(|_next: BoxHostHandler| {
                host_fn(|w: &mut ResponseWriter, _req: &Request| {
                    w.set_status(StatusCode::TOO_MANY_REQUESTS);
                })
            }));

        let (ctx, w) = serve(&*chain.then_fn(terminal));

        assert_eq!(w.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(w.body().is_empty());
        assert_eq!(ctx.value::<String>("test").map(String::as_str), Some("b0-"));
    }

    #[test]
    fn double_call_keeps_first_context() {
        let chain = Chain::new().append(wrap(|next: BoxHostHandler| {
            host_fn(move |w: &mut ResponseWriter, req: &Request| {
                next.serve(w, req);
                next.serve(w, req);
            })
        }));

        let (ctx, w) = serve(&*chain.then_fn(terminal));

        assert_eq!(w.body(), b"h0-h0-");
        assert_eq!(ctx.value::<String>("test").map(String::as_str), Some("h0-"));
    }
}
