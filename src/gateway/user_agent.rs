//! User-Agent resolver.
//!
//! The upstream picks the binary font format from the `User-Agent` it sees,
//! so the font type a client asks for is turned into a browser identity
//! known to be served that format.

use http::HeaderValue;

use crate::error::Error;

/// Font type meaning "forward the caller's own `User-Agent`".
pub const DETECT: &str = "detect";

/// Font types with a fixed identity, and the identity sent for each.
///
/// Any client the upstream does not recognise as a browser gets TrueType,
/// so `ttf` is this crate's own name.
pub static FONT_TYPES: [(&str, &str); 4] = [
    ("ttf", concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))),
    ("woff", "Mozilla/5.0 (Windows NT 5.1; rv:31.0) Gecko/20100101 Firefox/31.0"),
    (
        "woff2",
        "Mozilla/5.0 (Windows NT 6.3; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/37.0.2062.120 Safari/537.36",
    ),
    (
        "eot",
        "Mozilla/5.0 (compatible; MSIE 8.0; Windows NT 6.1; Trident/4.0; \
         GTB7.4; InfoPath.2; SV1; .NET CLR 3.3.69573; WOW64; en-US)",
    ),
];

/// Resolves the `User-Agent` to send upstream for `font_type`.
///
/// `caller` is the requesting client's own `User-Agent`, consulted only for
/// [`DETECT`] and forwarded byte for byte, whatever it contains.
///
/// # Errors
///
/// [`Error::UnresolvedFontType`] for an unknown font type, or for `detect`
/// when the caller sent no (or an empty) `User-Agent`.
pub fn resolve(font_type: &str, caller: Option<&HeaderValue>) -> Result<HeaderValue, Error> {
    if font_type == DETECT {
        return caller
            .filter(|ua| !ua.is_empty())
            .cloned()
            .ok_or(Error::UnresolvedFontType);
    }

    FONT_TYPES
        .iter()
        .find(|(known, _)| *known == font_type)
        .map(|&(_, ua)| HeaderValue::from_static(ua))
        .ok_or(Error::UnresolvedFontType)
}
