//! The response sink handlers write into.
//!
//! A [`ResponseWriter`] buffers status, headers, and body in memory while the
//! chain runs. The server turns it into a real HTTP response once the
//! outermost handler returns, so every layer can still change the status or
//! add headers after its downstream has written.

use std::fmt;

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

/// Buffered response sink.
///
/// ```rust
/// use std::fmt::Write;
/// use ctxchain::ResponseWriter;
///
/// let mut w = ResponseWriter::new();
/// write!(w, "h{}\n", 1).unwrap();
/// assert_eq!(w.status(), 200);
/// assert_eq!(w.body(), b"h1\n");
/// ```
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    /// An empty `200 OK` response.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets a header, replacing any previous value with the same name.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Appends `bytes` to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Converts the buffered state into a response hyper can send.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

impl fmt::Write for ResponseWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s.as_bytes());
        Ok(())
    }
}
