//! `webfont-gateway` binary.
//!
//! Run with:
//!   RUST_LOG=info cargo run -- --port 3000
//!
//! Try:
//!   curl -OJ 'http://localhost:3000/woff2/css?family=Roboto:400,700'
//!   curl http://localhost:3000/ping

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webfont_gateway::{Config, Error, Gateway, Server, Upstream};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    info!(
        upstream = %config.upstream_base(),
        max_concurrent_fetches = config.max_concurrent_fetches,
        "starting"
    );

    let upstream = Upstream::new(config.fetch_timeout())?;
    let app = Gateway::new(upstream, &config).router();

    Server::bind(config.addr()).serve(app).await
}
