//! Runtime configuration, from the command line or the environment.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

/// Google Fonts' stylesheet API.
pub const DEFAULT_UPSTREAM: &str = "https://fonts.googleapis.com";

/// Where `GET /` redirects to.
pub const DEFAULT_DOCS_URL: &str = "https://github.com/jpillora/webfont-downloader";

/// Streams a web font stylesheet and its font files as one ZIP archive.
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct Config {
    /// Listening port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Base URL stylesheet queries are forwarded to
    #[arg(long, env = "UPSTREAM_URL", default_value = DEFAULT_UPSTREAM)]
    pub upstream: String,

    /// Redirect target for `/`
    #[arg(long, default_value = DEFAULT_DOCS_URL)]
    pub docs_url: String,

    /// Seconds before an upstream request is abandoned
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub fetch_timeout: u64,

    /// Font files downloaded at once per archive
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_concurrent_fetches: u64,
}

impl Config {
    /// Wildcard address on the configured port.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    /// Upstream base without a trailing slash, ready to prefix a `/css?…` query.
    pub fn upstream_base(&self) -> &str {
        self.upstream.trim_end_matches('/')
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            upstream: DEFAULT_UPSTREAM.to_owned(),
            docs_url: DEFAULT_DOCS_URL.to_owned(),
            fetch_timeout: 30,
            max_concurrent_fetches: 8,
        }
    }
}
