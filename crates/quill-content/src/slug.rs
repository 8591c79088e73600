//! Slug derivation and link encoding.
//!
//! A slug is the filename stem a post is published under. Deriving it and
//! encoding it for a URL are separate steps: [`derive_slug`] produces the
//! on-disk name (non-ASCII kept as-is), and [`LinkEncoding`] decides how that
//! name is written into an `href`.

use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;

/// Slug used when a title has nothing left after cleanup.
const FALLBACK_SLUG: &str = "untitled";

/// Characters escaped inside a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Derive the slug for a title.
///
/// Lowercases, trims, and joins whitespace-separated words with a single
/// hyphen. Characters that cannot appear in a filename act as separators,
/// and leading dots are dropped so a slug never names a hidden file or a
/// parent directory. Deriving a slug from a slug returns it unchanged.
pub fn derive_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let slug = lowered
        .split(|c: char| c.is_whitespace() || is_unsafe_filename_char(c))
        // `.` and `..` words would name a directory, not a file
        .filter(|word| !word.chars().all(|c| c == '.'))
        .collect::<Vec<_>>()
        .join("-");
    let slug = slug.trim_start_matches('.');

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

fn is_unsafe_filename_char(c: char) -> bool {
    c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

/// How slugs and category names are written into link targets.
///
/// Filenames on disk always use the raw slug. Static hosts decode the
/// request path before looking up the file, so percent-encoded links still
/// resolve to the raw name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkEncoding {
    /// Percent-encode each path segment (default)
    #[default]
    Percent,
    /// Write segments verbatim
    Raw,
}

impl LinkEncoding {
    /// Encode one path segment for use in an `href`.
    pub fn segment<'a>(&self, segment: &'a str) -> Cow<'a, str> {
        match self {
            Self::Percent => utf8_percent_encode(segment, PATH_SEGMENT).into(),
            Self::Raw => Cow::Borrowed(segment),
        }
    }

    /// Link target for a post page, relative to its category directory.
    pub fn post_href(&self, slug: &str) -> String {
        format!("{}.html", self.segment(slug))
    }
}
