//! Liveness probe.
//!
//! Hosting platforms that idle or restart unresponsive processes poll
//! `/ping`. If the process can answer HTTP at all it is alive, so the handler
//! has no dependencies.

use crate::{Request, Response};

/// Always returns `200 OK` with body `Pong`.
pub async fn ping(_req: Request) -> Response {
    Response::text("Pong")
}
