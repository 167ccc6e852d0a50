//! # webfont-gateway
//!
//! Turns a hosted web font stylesheet into a self-contained download.
//!
//! ```text
//! GET /woff2/css?family=Roboto
//! ```
//!
//! fetches `https://fonts.googleapis.com/css?family=Roboto` as a browser that
//! is served WOFF2, rewrites every `url(https://…/x.woff2)` in it to
//! `url(./Roboto-<n>.woff2)`, downloads those files concurrently and streams
//! back `Roboto.zip` holding `Roboto.css` plus every font file. The archive is
//! written to the socket as entries complete; it is never buffered whole.
//!
//! | Path | Answer |
//! |---|---|
//! | `/` | `302` to the project page |
//! | `/ping` | `200 Pong` |
//! | `/[<fontType>]/css?family=<spec>` | `200` streamed ZIP |
//! | anything else | `400 Invalid request: <path>` |
//!
//! `fontType` is one of `ttf`, `woff` (the default), `woff2`, `eot`, or
//! `detect` to forward the caller's own `User-Agent`.
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use webfont_gateway::{Config, Gateway, Server, Upstream};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), webfont_gateway::Error> {
//!     let config = Config::default();
//!     let upstream = Upstream::new(config.fetch_timeout())?;
//!     let app = Gateway::new(upstream, &config).router();
//!     Server::bind(config.addr()).serve(app).await
//! }
//! ```

mod config;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod upstream;

pub mod archive;
pub mod gateway;
pub mod health;
pub mod rewrite;

pub use config::Config;
pub use error::Error;
pub use gateway::{FontRequest, Gateway, RequestCounter};
pub use handler::Handler;
pub use request::Request;
pub use response::{Body, ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use upstream::{Fetch, Upstream};
