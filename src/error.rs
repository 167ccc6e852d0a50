//! Unified error type.

use http::StatusCode;
use thiserror::Error;

use crate::response::{IntoResponse, Response};

/// The error type returned by the gateway's fallible operations.
///
/// The first group of variants is what a client can see: each maps to the
/// status returned by [`Error::status`] and renders its `Display` text as the
/// response body. Archive and I/O failures happen after the `200` status line
/// has been committed, so they only ever reach the logs.
#[derive(Debug, Error)]
pub enum Error {
    /// The path did not match `[/<fontType>]/css?family=<spec>`.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Could not resolve font type")]
    UnresolvedFontType,

    /// The upstream connection could not be established (or timed out).
    #[error("Could not connect to {host}")]
    UpstreamUnreachable { host: String },

    /// Connected, but the response body could not be read to the end.
    #[error("Download cancelled by {host}")]
    DownloadInterrupted { host: String },

    #[error("{host} answered with status {status}")]
    UpstreamRejected { host: String, status: u16 },

    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("archive already finalized")]
    ArchiveFinalized,

    #[error("archive: {0}")]
    Archive(#[from] rawzip::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::UnresolvedFontType => StatusCode::BAD_REQUEST,
            Self::UpstreamUnreachable { .. }
            | Self::DownloadInterrupted { .. }
            | Self::UpstreamRejected { .. } => StatusCode::BAD_GATEWAY,
            Self::HttpClient(_) | Self::ArchiveFinalized | Self::Archive(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        Response::builder().status(self.status()).text(self.to_string())
    }
}
