//! Request interpreter: `[/<fontType>]/css?family=<spec>[…]` → [`FontRequest`].

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

/// Used when the path has no font-type segment.
pub const DEFAULT_FONT_TYPE: &str = "woff";

/// Optional font type, then the upstream query whose family value runs up
/// to the first `:` (style list) or `&` (next parameter).
static REQUEST_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:/([a-z2]+))?(/css\?family=([^:&]+).*)$").expect("request path pattern is valid")
});

/// A validated font download request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontRequest {
    pub font_type: String,
    /// Path and query forwarded verbatim to the upstream host.
    pub query: String,
    /// Family specification with every non-word character removed.
    pub archive_name: String,
}

impl FontRequest {
    /// Parses a request target such as `/woff2/css?family=Open+Sans:400`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] carrying `path_and_query` if it does not have
    /// the expected shape or the family sanitizes to nothing.
    pub fn parse(path_and_query: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidRequest(path_and_query.to_owned());

        let caps = REQUEST_PATH.captures(path_and_query).ok_or_else(invalid)?;
        let font_type = caps.get(1).map_or(DEFAULT_FONT_TYPE, |m| m.as_str());
        let archive_name = sanitize(&caps[3]);
        if archive_name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            font_type: font_type.to_owned(),
            query: caps[2].to_owned(),
            archive_name,
        })
    }

    /// Name of the rewritten stylesheet inside the archive.
    pub fn stylesheet_name(&self) -> String {
        format!("{}.css", self.archive_name)
    }

    /// Name offered to the client for the archive itself.
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.archive_name)
    }
}

/// Keeps ASCII letters, digits and `_`. Lossy and idempotent.
pub fn sanitize(family: &str) -> String {
    family.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect()
}
