//! Stylesheet rewriting.
//!
//! A single left-to-right pass replaces every `url(http[s]://….<ext>)` with
//! `url(./<archive>-<n>.<ext>)` and records what it replaced. The pass has no
//! side effects: fetching the recorded references is the caller's business
//! (see [`ArchiveSession::rewrite`](crate::archive::ArchiveSession::rewrite)).

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Remote URL up to the final dot, then the extension.
static FONT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"url\((https?://[^)]+)\.(\w+)\)").expect("font url pattern is valid")
});

/// One remote font file found in a stylesheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontFileReference {
    pub remote_url: String,
    pub extension: String,
    /// `<archive>-<sequence>.<extension>`, sequence starting at 1 in
    /// document order. Unique within one archive.
    pub local_name: String,
}

/// Output of [`rewrite`].
#[derive(Debug)]
pub struct Rewrite {
    pub css: String,
    /// In document order; `references[i]` carries sequence `i + 1`.
    pub references: Vec<FontFileReference>,
}

/// Rewrites every remote font URL in `css` to a path local to the archive.
///
/// Repeated occurrences of the same URL get separate sequence numbers and
/// therefore separate entries.
pub fn rewrite(css: &str, archive_name: &str) -> Rewrite {
    let mut references = Vec::new();

    let css = FONT_URL
        .replace_all(css, |caps: &Captures<'_>| {
            let extension = caps[2].to_owned();
            let sequence = references.len() + 1;
            let local_name = format!("{archive_name}-{sequence}.{extension}");
            let replacement = format!("url(./{local_name})");

            references.push(FontFileReference {
                remote_url: format!("{}.{}", &caps[1], extension),
                extension,
                local_name,
            });
            replacement
        })
        .into_owned();

    Rewrite { css, references }
}
