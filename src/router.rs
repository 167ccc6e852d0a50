//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Requests that match no
//! route go to the fallback handler, which answers `404` unless replaced.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{Body, Response};

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    fallback: Option<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), fallback: None }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// ```rust,no_run
    /// # use http::Method;
    /// # use webfont_gateway::{Request, Response, Router};
    /// # async fn ping(_: Request) -> Response { Response::text("Pong") }
    /// # async fn fonts(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET, "/ping",             ping)
    ///     .on(Method::GET, "/{font_type}/css",  fonts);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Handler for requests no route matches.
    pub fn fallback(mut self, handler: impl Handler) -> Self {
        self.fallback = Some(handler.into_boxed_handler());
        self
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Option<BoxedHandler> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        Some(Arc::clone(matched.value))
    }

    /// Routes one request and produces its response. The request body is
    /// never read.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<Body> {
        let (parts, _) = req.into_parts();
        let req = Request::from_parts(parts);

        let handler = self
            .lookup(req.method(), req.path())
            .or_else(|| self.fallback.clone());

        let response = match handler {
            Some(handler) => handler.call(req).await,
            None => Response::status(StatusCode::NOT_FOUND),
        };

        response.into_http()
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
