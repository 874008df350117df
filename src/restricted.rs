//! Classification of privileged browser pages that must not be captured

use url::Url;

const RESTRICTED_SCHEMES: &[&str] = &["chrome", "edge", "about"];

/// Whether `url` points at a browser-internal page (`chrome://`, `edge://`,
/// `about:`)
///
/// Extension pages, ordinary web pages, empty strings and anything that
/// does not parse as a URL are not restricted.
pub fn is_restricted_url(url: &str) -> bool {
    match Url::parse(url.trim()) {
        Ok(parsed) => RESTRICTED_SCHEMES.contains(&parsed.scheme()),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_internal_pages_are_restricted() {
        assert!(is_restricted_url("chrome://settings"));
        assert!(is_restricted_url("chrome://extensions/?id=abc"));
        assert!(is_restricted_url("edge://flags"));
        assert!(is_restricted_url("about:blank"));
        assert!(is_restricted_url("CHROME://newtab"));
    }

    #[test]
    fn regular_and_extension_pages_are_not() {
        assert!(!is_restricted_url("https://example.com/chrome://x"));
        assert!(!is_restricted_url("chrome-extension://abcdef/app.html"));
        assert!(!is_restricted_url("file:///tmp/page.html"));
        assert!(!is_restricted_url(""));
        assert!(!is_restricted_url("not a url"));
    }
}
