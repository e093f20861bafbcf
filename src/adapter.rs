//! Bridges between the host handler world and the context-carrying one.
//!
//! | Adapter | Wraps | Acts as | Context |
//! |---|---|---|---|
//! | [`AddContext`] | [`Handler`] | [`HostHandler`] | fresh root in, result dropped |
//! | [`StripContext`] | [`HostHandler`] | [`Handler`] | passed through untouched |

use crate::context::Context;
use crate::handler::Handler;
use crate::host::HostHandler;
use crate::request::Request;
use crate::response::ResponseWriter;

/// Exposes a [`Handler`] to the server.
///
/// Every call starts from [`Context::background`]; nothing from a previous
/// request leaks into the next one. The context the handler returns has no
/// channel to travel further and is dropped.
#[derive(Clone, Debug)]
pub struct AddContext<H> {
    handler: H,
}

impl<H> AddContext<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn get_ref(&self) -> &H {
        &self.handler
    }
}

impl<H: Handler> HostHandler for AddContext<H> {
    fn serve(&self, w: &mut ResponseWriter, req: &Request) {
        let _ = self.handler.serve(Context::background(), w, req);
    }
}

/// Lets a [`HostHandler`] act as the terminal handler of a chain.
///
/// The incoming context is ignored by the wrapped handler and returned as-is.
#[derive(Clone, Debug)]
pub struct StripContext<H> {
    handler: H,
}

impl<H> StripContext<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn get_ref(&self) -> &H {
        &self.handler
    }
}

impl<H: HostHandler> Handler for StripContext<H> {
    fn serve(&self, ctx: Context, w: &mut ResponseWriter, req: &Request) -> Context {
        self.handler.serve(w, req);
        ctx
    }
}
