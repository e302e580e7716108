// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::borrow::Cow;

use const_format::concatcp;
use url::Url;
use urlencoding::encode;

pub const USER_AGENT: &str = concatcp!(
    "auf-connect/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/auf-connect/auf-connect)"
);

/// Maximum length (in characters) of long free-text fields
/// before they get truncated.
pub const MAX_TEXT_LEN: usize = 500;

/// Appended to text that got truncated.
pub const TRUNCATION_MARKER: &str = "...";

/// Percent-encodes a value for use in a URL query.
///
/// ```
/// # use auf_connect::tools::url_encode;
/// assert_eq!(url_encode("Afrique de l'Ouest"), "Afrique%20de%20l%27Ouest");
/// ```
#[must_use]
pub fn url_encode(input: &str) -> Cow<str> {
    encode(input)
}

/// Resolves a link found on a page of the site at `base`.
///
/// Absolute links are returned as they are.
/// Relative links are resolved against the root of the site,
/// no matter whether they start with a slash or not,
/// because the source sites use both forms for the same thing.
///
/// ```
/// # use auf_connect::tools::absolutize;
/// # use url::Url;
/// let base = Url::parse("https://example.org/some/listing/").unwrap();
/// assert_eq!(absolutize(&base, "/x"), "https://example.org/x");
/// assert_eq!(absolutize(&base, "x"), "https://example.org/x");
/// assert_eq!(absolutize(&base, "https://other.org/y"), "https://other.org/y");
/// ```
#[must_use]
pub fn absolutize(base: &Url, raw_link: &str) -> String {
    let link = raw_link.trim();
    if link.is_empty() || Url::parse(link).is_ok() {
        return link.to_owned();
    }
    if link.starts_with("//") {
        return format!("{}:{link}", base.scheme());
    }
    let origin = base.origin().ascii_serialization();
    if link.starts_with('/') {
        format!("{origin}{link}")
    } else {
        format!("{origin}/{link}")
    }
}

/// Trims and collapses all runs of white-space (including non-breaking spaces)
/// into a single space.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to at most `max_len` characters,
/// appending [`TRUNCATION_MARKER`] if anything was cut.
#[must_use]
pub fn truncate(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        None => text.to_owned(),
        Some((byte_idx, _)) => {
            let mut truncated = text.get(..byte_idx).unwrap_or(text).to_owned();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
    }
}

/// Like [`truncate`] with the default maximum length for free-text fields.
#[must_use]
pub fn truncate_long_text(text: &str) -> String {
    truncate(text, MAX_TEXT_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/x", "https://example.org/x")]
    #[case("x", "https://example.org/x")]
    #[case("  /nos-actions/projet-a/ ", "https://example.org/nos-actions/projet-a/")]
    #[case("//cdn.example.org/a.png", "https://cdn.example.org/a.png")]
    #[case("http://auf.org/a", "http://auf.org/a")]
    #[case("", "")]
    fn absolutizes_against_site_root(#[case] link: &str, #[case] expected: &str) {
        let base = Url::parse("https://example.org/deep/path/page.html").unwrap();
        assert_eq!(absolutize(&base, link), expected);
    }

    #[test]
    fn normalizes_white_space() {
        assert_eq!(normalize_text("\n  Université \u{a0} de\tMontréal \n"), "Université de Montréal");
    }

    #[test]
    fn short_text_is_not_marked() {
        let text = "é".repeat(MAX_TEXT_LEN);
        let truncated = truncate_long_text(&text);
        assert_eq!(truncated, text);
        assert!(!truncated.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn long_text_is_bounded_and_marked() {
        let text = "é".repeat(MAX_TEXT_LEN + 1);
        let truncated = truncate_long_text(&text);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            truncated.chars().count(),
            MAX_TEXT_LEN + TRUNCATION_MARKER.chars().count()
        );
    }
}
