//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] body is either a buffer that is known up front (plain-text
//! replies, redirects, errors) or a stream whose length is not known when the
//! status line goes out (the font archive). Both are carried as a [`Body`] so
//! the server has a single type to hand to hyper.

use std::convert::Infallible;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use tracing::error;

/// The body type every response is converted into before it reaches hyper.
pub type Body = BoxBody<Bytes, Infallible>;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values the gateway sends.
pub enum ContentType {
    Text, // text/plain; charset=utf-8
    Zip,  // application/zip
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Zip  => "application/zip",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use webfont_gateway::Response;
///
/// Response::text("Pong");
/// Response::status(StatusCode::NO_CONTENT);
/// Response::redirect("https://example.com/docs");
///
/// Response::builder()
///     .status(StatusCode::BAD_REQUEST)
///     .text("Could not resolve font type");
/// ```
pub struct Response {
    pub(crate) body: Body,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// `302 Found` pointing at `location`.
    pub fn redirect(location: &str) -> Self {
        Self::builder()
            .status(StatusCode::FOUND)
            .header("location", location)
            .text("Redirecting...")
    }

    /// Builder for responses that need a custom status, extra headers or a
    /// streamed body.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Case-insensitive lookup of a header set on this response.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the `http` representation hyper writes to the wire.
    ///
    /// A header that is not a valid HTTP header turns the whole response into
    /// a bodyless `500`.
    pub fn into_http(self) -> http::Response<Body> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(self.body).unwrap_or_else(|e| {
            error!("invalid response header: {e}");
            let mut res = http::Response::new(empty());
            *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            res
        })
    }
}

fn empty() -> Body {
    Empty::<Bytes>::new().boxed()
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by one of the body methods.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        let body = Full::new(Bytes::from(body.into())).boxed();
        self.finish(ContentType::Text, body)
    }

    /// Terminate with a body that is produced while the response is being
    /// written. No `content-length` is sent; hyper falls back to chunked
    /// transfer encoding on HTTP/1.1.
    pub fn stream<B>(self, content_type: ContentType, body: B) -> Response
    where
        B: hyper::body::Body<Data = Bytes, Error = Infallible> + Send + Sync + 'static,
    {
        self.finish(content_type, body.boxed())
    }

    /// Terminate with no body.
    pub fn no_body(self) -> Response {
        Response { body: empty(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: ContentType, body: Body) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.as_str().to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Handlers may return anything implementing this trait, including
/// `Result<Response, Error>`: the error side renders through
/// [`Error`](crate::Error)'s own implementation.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: IntoResponse,
{
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}
