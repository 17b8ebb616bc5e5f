//! Favicon reference extraction from page markup.

use scraper::{Html, Selector};
use url::Url;

/// Link tags consulted, highest priority first.
const ICON_SELECTORS: [&str; 3] = [
    r#"link[rel="icon"]"#,
    r#"link[rel="shortcut icon"]"#,
    r#"link[rel="apple-touch-icon"]"#,
];

/// Conventional location used when the page declares no icon.
pub const DEFAULT_FAVICON_PATH: &str = "/favicon.ico";

/// Find the favicon reference declared by `html`.
///
/// For each selector only the first matching element is consulted; a missing
/// or empty `href` on it falls through to the next selector.
pub fn find_icon_href(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    ICON_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty())
                .map(str::to_string)
        })
}

/// Turn a favicon reference into an absolute URL on the target's origin.
///
/// References already carrying an `http(s)://` prefix are returned as-is.
/// Anything else is joined onto `scheme://host[:port]`; queries, fragments
/// and dot segments are left untouched.
pub fn absolutize(reference: &str, target: &Url) -> String {
    if has_http_scheme(reference) {
        return reference.to_string();
    }

    let origin = target.origin().ascii_serialization();
    if reference.starts_with('/') {
        format!("{origin}{reference}")
    } else {
        format!("{origin}/{reference}")
    }
}

fn has_http_scheme(reference: &str) -> bool {
    let lower = reference
        .get(..8)
        .unwrap_or(reference)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Extract the absolute favicon URL for a page fetched from `target`.
pub fn extract_favicon(html: &str, target: &Url) -> String {
    let reference = find_icon_href(html).unwrap_or_else(|| DEFAULT_FAVICON_PATH.to_string());
    absolutize(&reference, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Url {
        Url::parse("https://example.com/blog/post?id=4").unwrap()
    }

    #[test]
    fn test_icon_link() {
        let html = r#"<html><head><link rel="icon" href="/icon.png"></head></html>"#;
        assert_eq!(extract_favicon(html, &target()), "https://example.com/icon.png");
    }

    #[test]
    fn test_priority_order() {
        let html = r#"<head>
            <link rel="apple-touch-icon" href="/apple.png">
            <link rel="shortcut icon" href="/shortcut.ico">
            <link rel="icon" href="/icon.svg">
        </head>"#;
        assert_eq!(find_icon_href(html).as_deref(), Some("/icon.svg"));

        let html = r#"<head>
            <link rel="apple-touch-icon" href="/apple.png">
            <link rel="shortcut icon" href="/shortcut.ico">
        </head>"#;
        assert_eq!(find_icon_href(html).as_deref(), Some("/shortcut.ico"));

        let html = r#"<head><link rel="apple-touch-icon" href="/apple.png"></head>"#;
        assert_eq!(find_icon_href(html).as_deref(), Some("/apple.png"));
    }

    #[test]
    fn test_first_match_without_href_falls_through() {
        let html = r#"<head>
            <link rel="icon">
            <link rel="icon" href="/second.png">
            <link rel="apple-touch-icon" href="/apple.png">
        </head>"#;
        assert_eq!(find_icon_href(html).as_deref(), Some("/apple.png"));
    }

    #[test]
    fn test_rel_must_match_exactly() {
        let html = r#"<head><link rel="icon mask" href="/mask.svg"><link rel="stylesheet" href="/a.css"></head>"#;
        assert_eq!(find_icon_href(html), None);
    }

    #[test]
    fn test_default_path() {
        let html = "<html><head><title>No icons</title></head><body></body></html>";
        assert_eq!(extract_favicon(html, &target()), "https://example.com/favicon.ico");
        assert_eq!(extract_favicon("", &target()), "https://example.com/favicon.ico");
    }

    #[test]
    fn test_absolute_reference_unchanged() {
        for href in ["https://cdn.example.net/fav.png", "HTTP://CDN.example.net/a.ico"] {
            let html = format!(r#"<link rel="icon" href="{href}">"#);
            assert_eq!(extract_favicon(&html, &target()), href);
        }
    }

    #[test]
    fn test_relative_reference_joins_origin() {
        assert_eq!(absolutize("static/icon.png", &target()), "https://example.com/static/icon.png");
        assert_eq!(absolutize("/static/icon.png", &target()), "https://example.com/static/icon.png");
    }

    #[test]
    fn test_origin_keeps_explicit_port() {
        let target = Url::parse("http://example.com:8080/page").unwrap();
        assert_eq!(absolutize("/i.png", &target), "http://example.com:8080/i.png");

        let target = Url::parse("https://example.com:443/page").unwrap();
        assert_eq!(absolutize("/i.png", &target), "https://example.com/i.png");
    }

    #[test]
    fn test_non_http_scheme_is_treated_as_relative() {
        assert_eq!(absolutize("data:image/png;base64,AAAA", &target()), "https://example.com/data:image/png;base64,AAAA");
    }
}
