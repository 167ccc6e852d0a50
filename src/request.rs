//! Incoming HTTP request type.

use http::{HeaderMap, HeaderValue, Method, Uri};

/// An incoming HTTP request.
///
/// The gateway only serves `GET`s, so the body is never read; a request is
/// its method, target and headers.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
}

impl Request {
    pub(crate) fn from_parts(parts: http::request::Parts) -> Self {
        Self { method: parts.method, uri: parts.uri, headers: parts.headers }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// Path plus query string, exactly as the client sent it
    /// (e.g. `/woff2/css?family=Roboto:400`).
    pub fn path_and_query(&self) -> &str {
        self.uri.path_and_query().map_or_else(|| self.uri.path(), |pq| pq.as_str())
    }

    /// Query string without the `?`, if the target had one.
    pub fn query(&self) -> Option<&str> { self.uri.query() }

    /// Case-insensitive header lookup. The value is returned as received,
    /// including bytes outside visible ASCII.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }
}
