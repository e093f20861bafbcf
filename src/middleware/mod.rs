//! Middleware constructors and chains.
//!
//! A middleware is written as a [`Constructor`]: given the downstream
//! handler `next`, it returns a new handler that may act before calling
//! `next`, after it, or both, and may derive the context it passes down and
//! the one it hands back.
//!
//! A [`Chain`] holds constructors in request order and folds them around a
//! terminal handler:
//!
//! ```text
//! Chain::new().append(m1).append(m2).append(m3).then(h)
//!
//!   ≡  m1(m2(m3(h)))
//!
//!   request  ──▶ m1 ──▶ m2 ──▶ m3 ──▶ h
//!   response ◀── m1 ◀── m2 ◀── m3 ◀──┘
//! ```
//!
//! Context-less middleware written against [`HostHandler`](crate::HostHandler)
//! joins a chain through [`legacy::wrap`].

pub mod legacy;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::adapter::{AddContext, StripContext};
use crate::context::Context;
use crate::handler::{handler_fn, BoxHandler, Handler, Noop};
use crate::host::{BoxHostHandler, HostHandler, NotFound};
use crate::request::Request;
use crate::response::ResponseWriter;

// ── Constructor ───────────────────────────────────────────────────────────────

/// Builds a wrapping handler around `next`.
///
/// Implemented for every `Fn(BoxHandler) -> H` closure, so a middleware is
/// usually just a function:
///
/// ```rust
/// use ctxchain::{handler_fn, BoxHandler, Context, Handler, Request, ResponseWriter};
///
/// fn tag(next: BoxHandler) -> impl Handler {
///     handler_fn(move |ctx: Context, w: &mut ResponseWriter, req: &Request| {
///         w.write(b"before-");
///         let ctx = next.serve(ctx, w, req);
///         w.write(b"after-");
///         ctx
///     })
/// }
/// ```
///
/// A constructor runs once per [`Chain::then`] call, never per request. It
/// must not rely on being called only once: reusing a chain calls it again.
pub trait Constructor: Send + Sync + 'static {
    fn construct(&self, next: BoxHandler) -> BoxHandler;
}

/// A shared, type-erased [`Constructor`].
pub type BoxConstructor = Arc<dyn Constructor>;

impl<F, H> Constructor for F
where
    F: Fn(BoxHandler) -> H + Send + Sync + 'static,
    H: Handler,
{
    fn construct(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(self(next))
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An immutable, ordered list of middleware constructors.
///
/// Extending a chain returns a new value and leaves the receiver as it was,
/// so one base chain can be shared and specialised freely:
///
/// ```rust
/// # use ctxchain::{BoxHandler, Chain};
/// # fn auth(next: BoxHandler) -> BoxHandler { next }
/// # fn csrf(next: BoxHandler) -> BoxHandler { next }
/// # fn audit(next: BoxHandler) -> BoxHandler { next }
/// let base = Chain::new().append(auth).append(csrf);
/// let audited = base.append(audit);
///
/// assert_eq!(base.len(), 2);
/// assert_eq!(audited.len(), 3);
/// ```
///
/// Composing never changes the chain either; call any `then*` method as often
/// as needed, from any thread.
#[derive(Clone, Default)]
pub struct Chain {
    constructors: Vec<BoxConstructor>,
}

impl Chain {
    /// An empty chain. Composing it yields the terminal handler itself.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Returns a new chain with `constructor` as the innermost middleware.
    pub fn append(&self, constructor: impl Constructor) -> Self {
        self.append_all([Arc::new(constructor) as BoxConstructor])
    }

    /// Returns a new chain with `constructors` added innermost, in order.
    pub fn append_all<I>(&self, constructors: I) -> Self
    where
        I: IntoIterator<Item = BoxConstructor>,
    {
        let mut next = self.constructors.clone();
        next.extend(constructors);
        Self { constructors: next }
    }

    /// Returns a new chain running `self`'s middleware, then `other`'s.
    pub fn extend(&self, other: &Chain) -> Self {
        self.append_all(other.constructors.iter().cloned())
    }

    /// Folds the chain around `handler`.
    ///
    /// `Chain[m1, m2, m3].then(h)` is `m1(m2(m3(h)))`: `m1` sees the request
    /// first and the response last. Every constructor is invoked anew, so two
    /// calls produce independent handlers. A panicking constructor aborts
    /// the build.
    pub fn then(&self, handler: impl Handler) -> BoxHandler {
        self.compose(Arc::new(handler))
    }

    /// Like [`then`](Self::then), for a plain function.
    pub fn then_fn<F>(&self, f: F) -> BoxHandler
    where
        F: Fn(Context, &mut ResponseWriter, &Request) -> Context + Send + Sync + 'static,
    {
        self.then(handler_fn(f))
    }

    /// Folds the chain around [`Noop`], for chains whose middleware does all
    /// the work.
    pub fn then_noop(&self) -> BoxHandler {
        self.then(Noop)
    }

    /// Folds the chain around `handler`, or around [`Noop`] when it is `None`.
    ///
    /// ```rust
    /// # use ctxchain::{Chain, Noop};
    /// let h = Chain::new().then_or_noop(None::<Noop>);
    /// ```
    pub fn then_or_noop<H: Handler>(&self, handler: Option<H>) -> BoxHandler {
        match handler {
            Some(handler) => self.then(handler),
            None => self.then_noop(),
        }
    }

    /// Folds the chain around `handler` and exposes the result to the server
    /// through [`AddContext`], so each request starts from an empty context.
    pub fn then_host(&self, handler: impl Handler) -> BoxHostHandler {
        Arc::new(AddContext::new(self.then(handler)))
    }

    /// Like [`then_host`](Self::then_host), for a plain function.
    pub fn then_host_fn<F>(&self, f: F) -> BoxHostHandler
    where
        F: Fn(Context, &mut ResponseWriter, &Request) -> Context + Send + Sync + 'static,
    {
        self.then_host(handler_fn(f))
    }

    /// Like [`then_host`](Self::then_host), terminating in the host's
    /// default handler, [`NotFound`].
    pub fn then_host_default(&self) -> BoxHostHandler {
        self.then_host(StripContext::new(NotFound))
    }

    /// Like [`then_host`](Self::then_host) when `handler` is `Some`, like
    /// [`then_host_default`](Self::then_host_default) when it is `None`.
    pub fn then_host_or_default<H: Handler>(&self, handler: Option<H>) -> BoxHostHandler {
        match handler {
            Some(handler) => self.then_host(handler),
            None => self.then_host_default(),
        }
    }

    /// Like [`then_host`](Self::then_host), terminating in an existing host
    /// handler.
    pub fn then_host_handler(&self, handler: impl HostHandler) -> BoxHostHandler {
        self.then_host(StripContext::new(handler))
    }

    fn compose(&self, terminal: BoxHandler) -> BoxHandler {
        debug!(layers = self.constructors.len(), "composing middleware chain");
        self.constructors
            .iter()
            .rev()
            .fold(terminal, |next, constructor| constructor.construct(next))
    }
}

impl FromIterator<BoxConstructor> for Chain {
    fn from_iter<I: IntoIterator<Item = BoxConstructor>>(iter: I) -> Self {
        Self { constructors: iter.into_iter().collect() }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.constructors.len()).finish()
    }
}
