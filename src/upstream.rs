//! Upstream fetcher.
//!
//! [`Fetch`] is the seam between the pipeline and the network: one `GET`
//! with a given `User-Agent`, returning the whole body. The same call serves
//! the stylesheet and every font file. [`Upstream`] is the production
//! implementation; tests substitute in-memory fetchers.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http::HeaderValue;
use reqwest::header::USER_AGENT;
use tracing::debug;

use crate::error::Error;

/// Performs a single upstream `GET`. No retries: a failed fetch is final.
pub trait Fetch: Send + Sync + 'static {
    /// Fetches `url` with `user_agent` as the outbound `User-Agent` header,
    /// sent exactly as given.
    ///
    /// # Errors
    ///
    /// - [`Error::UpstreamUnreachable`] if no response arrives.
    /// - [`Error::UpstreamRejected`] if the response status is not 2xx.
    /// - [`Error::DownloadInterrupted`] if the body cannot be read to the end.
    fn fetch(
        &self,
        user_agent: &HeaderValue,
        url: &str,
    ) -> impl Future<Output = Result<Bytes, Error>> + Send;
}

/// [`Fetch`] over a shared `reqwest` connection pool.
pub struct Upstream {
    client: reqwest::Client,
}

impl Upstream {
    /// Builds a client whose every request, body included, is bounded by
    /// `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Fetch for Upstream {
    async fn fetch(&self, user_agent: &HeaderValue, url: &str) -> Result<Bytes, Error> {
        let host = host_of(url);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent.clone())
            .send()
            .await
            .map_err(|e| {
                debug!(url, "request failed: {e}");
                Error::UpstreamUnreachable { host: host.clone() }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamRejected { host, status: status.as_u16() });
        }

        response.bytes().await.map_err(|e| {
            debug!(url, "body read failed: {e}");
            Error::DownloadInterrupted { host }
        })
    }
}

/// Host part of `url` for error messages; the raw string if it does not parse.
fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
