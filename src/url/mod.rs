//! URL handling module
//!
//! This module provides URL normalization plus the scope and relative-path
//! rules the scan pipeline applies to discovered references.

mod normalize;

pub use normalize::{normalize_parsed, normalize_url};

use url::Url;

/// Returns true if both URLs point at the same host (ignoring scheme and port)
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => false,
    }
}

/// Returns true if the reference carries its own scheme or authority
///
/// `https://cdn.example/x.js` and `//cdn.example/x.js` are absolute,
/// `/a.png` and `b.js` are not.
pub fn is_absolute_reference(reference: &str) -> bool {
    let reference = reference.trim();
    if reference.starts_with("//") {
        return true;
    }

    match reference.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && !scheme.contains('/')
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Computes the path recorded for a resource relative to the scan target
///
/// # Rules
///
/// | Reference as written | Resolved origin | Result |
/// |----------------------|-----------------|--------|
/// | relative (`/a.png`, `b.js`) | any | the reference, fragment stripped |
/// | absolute | same as target | path plus query of the resolved URL |
/// | absolute | different | the full resolved URL |
///
/// # Examples
///
/// ```
/// use url::Url;
/// use web_resource_scanner::url::relative_path;
///
/// let target = Url::parse("https://example.com").unwrap();
/// let resolved = Url::parse("https://example.com/b.js").unwrap();
/// assert_eq!(relative_path(&target, &resolved, "b.js"), "b.js");
/// ```
pub fn relative_path(target: &Url, resolved: &Url, reference: &str) -> String {
    let reference = reference.trim();

    if !reference.is_empty() && !is_absolute_reference(reference) {
        let without_fragment = reference.split('#').next().unwrap_or(reference);
        if !without_fragment.is_empty() {
            return without_fragment.to_string();
        }
    }

    if resolved.origin() == target.origin() {
        match resolved.query() {
            Some(query) => format!("{}?{}", resolved.path(), query),
            None => resolved.path().to_string(),
        }
    } else {
        resolved.to_string()
    }
}
