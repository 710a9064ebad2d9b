//! Resource classification
//!
//! Maps a URL and an optional Content-Type header to a `ResourceType` and a
//! file extension. The content type wins over the URL extension; anything
//! neither recognises is `Other`.

use crate::model::limits;
use crate::model::ResourceType;
use url::Url;

/// Classifies a resource
///
/// # Arguments
///
/// * `url` - The resource URL (absolute, or a bare path)
/// * `content_type` - The Content-Type header, if the resource was fetched
///
/// # Returns
///
/// The resource type and its extension. The extension is the URL's own
/// extension when it has one, otherwise the canonical extension of the type.
///
/// # Example
///
/// ```
/// use web_resource_scanner::crawler::classify;
/// use web_resource_scanner::ResourceType;
///
/// let (ty, ext) = classify("https://example.com/app.js?v=3", None);
/// assert_eq!(ty, ResourceType::JavaScript);
/// assert_eq!(ext, "js");
///
/// let (ty, ext) = classify("https://example.com/api/items", Some("application/json; charset=utf-8"));
/// assert_eq!(ty, ResourceType::Json);
/// assert_eq!(ext, "json");
/// ```
pub fn classify(url: &str, content_type: Option<&str>) -> (ResourceType, String) {
    let url_ext = url_extension(url);

    let resource_type = content_type
        .and_then(type_from_content_type)
        .or_else(|| url_ext.as_deref().and_then(type_from_extension))
        .unwrap_or(ResourceType::Other);

    let extension = url_ext.unwrap_or_else(|| resource_type.canonical_extension().to_string());

    (resource_type, extension)
}

/// Maps a Content-Type header value to a resource type
///
/// Parameters (`; charset=...`) and case are ignored.
pub fn type_from_content_type(content_type: &str) -> Option<ResourceType> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if mime.is_empty() {
        return None;
    }

    // Image subtypes like image/svg+xml must not fall through to XML
    if mime.starts_with("image/") {
        return Some(ResourceType::Image);
    }

    let ty = match mime.as_str() {
        "application/json" | "text/json" => ResourceType::Json,
        m if m.ends_with("+json") => ResourceType::Json,
        "application/javascript"
        | "application/x-javascript"
        | "application/ecmascript"
        | "text/javascript"
        | "text/ecmascript"
        | "module/javascript" => ResourceType::JavaScript,
        "application/xml" | "text/xml" => ResourceType::Xml,
        m if m.ends_with("+xml") && m != "application/xhtml+xml" => ResourceType::Xml,
        "application/yaml" | "application/x-yaml" | "text/yaml" | "text/x-yaml" => {
            ResourceType::Yaml
        }
        "text/css" => ResourceType::Css,
        "text/html" | "application/xhtml+xml" => ResourceType::Html,
        "text/plain" => ResourceType::Text,
        "application/pdf" => ResourceType::Pdf,
        _ => return None,
    };

    Some(ty)
}

/// Maps a lowercase file extension to a resource type
pub fn type_from_extension(extension: &str) -> Option<ResourceType> {
    let ty = match extension {
        "json" => ResourceType::Json,
        "js" | "mjs" | "cjs" => ResourceType::JavaScript,
        "xml" => ResourceType::Xml,
        "yml" | "yaml" => ResourceType::Yaml,
        "css" => ResourceType::Css,
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "ico" | "bmp" | "avif" => {
            ResourceType::Image
        }
        "html" | "htm" => ResourceType::Html,
        "txt" => ResourceType::Text,
        "pdf" => ResourceType::Pdf,
        _ => return None,
    };

    Some(ty)
}

/// Extracts the lowercase extension of the last path segment
///
/// Returns None when the segment has no extension, the extension is not
/// alphanumeric, or it is longer than the column bound.
pub fn url_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;

    if stem.is_empty() || ext.is_empty() || ext.len() > limits::FILE_EXTENSION {
        return None;
    }

    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}
