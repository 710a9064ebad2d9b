use crate::UrlError;
use url::Url;

/// Query parameters that only carry tracking state
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "_ga"];

/// Normalizes a URL into the form used as a resource identity
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http or https scheme and a host
/// 3. Host lowercasing, default-port removal and dot-segment removal come
///    from the URL parser itself
/// 4. Remove fragment (everything after #)
/// 5. Remove tracking query parameters, keeping the rest in their original
///    order; an emptied query string is dropped entirely
///
/// Scheme, trailing slashes and parameter order are preserved: for assets
/// they are part of what the server actually serves.
///
/// # Examples
///
/// ```
/// use web_resource_scanner::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/app.js?v=2#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/app.js?v=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Same as [`normalize_url`] for an already-parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let kept: Vec<&(String, String)> = pairs
            .iter()
            .filter(|(key, _)| !is_tracking_param(key))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else if kept.len() != pairs.len() {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Ok(url)
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
