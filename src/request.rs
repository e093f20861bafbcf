//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

/// An incoming HTTP request with its body fully buffered.
///
/// Handlers receive it by shared reference: the request is opaque input that
/// no layer of a chain may change for the layers below it.
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Bytes>,
}

impl Request {
    /// Wraps an `http::Request` whose body has already been collected.
    pub fn new(inner: http::Request<Bytes>) -> Self {
        Self { inner }
    }

    /// A bodiless `GET` for `uri`. Mostly useful in tests.
    ///
    /// An unparsable `uri` falls back to `/`.
    pub fn get(uri: &str) -> Self {
        let mut inner = http::Request::new(Bytes::new());
        *inner.uri_mut() = uri.parse().unwrap_or_else(|_| Uri::from_static("/"));
        Self { inner }
    }

    pub fn method(&self) -> &Method { self.inner.method() }
    pub fn uri(&self) -> &Uri { self.inner.uri() }
    pub fn path(&self) -> &str { self.inner.uri().path() }
    pub fn headers(&self) -> &HeaderMap { self.inner.headers() }
    pub fn body(&self) -> &[u8] { self.inner.body() }

    /// Case-insensitive header lookup. Non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    pub fn into_inner(self) -> http::Request<Bytes> {
        self.inner
    }
}
