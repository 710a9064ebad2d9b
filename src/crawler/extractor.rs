//! Link and resource extraction
//!
//! This module finds candidate resource URLs in fetched payloads:
//! - HTML: element attributes (`img`, `script`, `link`, `a`, ...) plus CSS
//!   embedded in `<style>` elements and `style` attributes
//! - CSS: `url(...)` references and `@import` rules
//!
//! Extraction never fails. Malformed input yields whatever could be
//! recovered, and anything suspicious is reported as a soft warning.

use crate::crawler::classifier::{type_from_content_type, type_from_extension, url_extension};
use crate::model::ResourceType;
use regex::Regex;
use scraper::{Html, Selector};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Warnings kept per document; the rest are counted
const MAX_WARNINGS: usize = 20;

/// `(selector, attribute, source element)` for every HTML reference we follow
const HTML_SOURCES: &[(&str, &str, &str)] = &[
    ("img[src]", "src", "img"),
    ("img[srcset]", "srcset", "img"),
    ("script[src]", "src", "script"),
    ("link[href]", "href", "link"),
    ("a[href]", "href", "a"),
    ("iframe[src]", "src", "iframe"),
    ("source[src]", "src", "source"),
    ("source[srcset]", "srcset", "source"),
    ("video[src]", "src", "video"),
    ("video[poster]", "poster", "video"),
    ("audio[src]", "src", "audio"),
    ("embed[src]", "src", "embed"),
    ("object[data]", "data", "object"),
];

/// A reference found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Absolute http(s) URL the reference resolves to
    pub url: Url,

    /// Tag of the element the reference came from (`css` for stylesheets)
    pub source_element: String,

    /// The reference exactly as written in the document
    pub reference: String,
}

/// Result of extracting one document
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub links: Vec<ExtractedLink>,
    pub warnings: Vec<String>,
}

impl Extraction {
    fn push(&mut self, seen: &mut HashSet<String>, link: ExtractedLink) {
        if seen.insert(link.url.as_str().to_string()) {
            self.links.push(link);
        }
    }
}

fn css_url_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).expect("CSS url() pattern is valid")
    })
}

fn css_import_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"@import\s+['"]([^'"]+)['"]"#).expect("CSS @import pattern is valid")
    })
}

/// Extracts candidate resource URLs from a fetched body
///
/// The payload kind comes from the Content-Type when it is recognised,
/// otherwise from the extension of `base_url`. Only HTML and CSS payloads
/// yield links.
///
/// # Arguments
///
/// * `base_url` - URL the body was fetched from (after redirects)
/// * `content_type` - The Content-Type header, if any
/// * `body` - Raw response bytes
///
/// # Example
///
/// ```
/// use url::Url;
/// use web_resource_scanner::crawler::extract;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let html = br#"<img src="/a.png"><script src="b.js"></script>"#;
/// let extraction = extract(&base, Some("text/html"), html);
/// assert_eq!(extraction.links.len(), 2);
/// assert_eq!(extraction.links[0].source_element, "img");
/// ```
pub fn extract(base_url: &Url, content_type: Option<&str>, body: &[u8]) -> Extraction {
    let kind = content_type
        .and_then(type_from_content_type)
        .or_else(|| url_extension(base_url.as_str()).as_deref().and_then(type_from_extension));

    match kind {
        Some(ResourceType::Html) | Some(ResourceType::Css) => {}
        _ => return Extraction::default(),
    }

    let mut extraction = Extraction::default();
    let text = String::from_utf8_lossy(body);
    if let Cow::Owned(_) = text {
        extraction
            .warnings
            .push("body is not valid UTF-8; decoded lossily".to_string());
    }

    let mut seen = HashSet::new();
    if kind == Some(ResourceType::Html) {
        extract_html(&text, base_url, &mut extraction, &mut seen);
    } else {
        extract_css(&text, base_url, "css", &mut extraction, &mut seen);
    }

    extraction
}

/// Extracts references from an HTML document
fn extract_html(html: &str, base_url: &Url, out: &mut Extraction, seen: &mut HashSet<String>) {
    let document = Html::parse_document(html);

    // A <base href> changes what relative references resolve against
    let base = document_base(&document, base_url);

    for (selector, attr, element) in HTML_SOURCES {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };

        for node in document.select(&selector) {
            let Some(value) = node.value().attr(attr) else {
                continue;
            };

            let references: Vec<&str> = if *attr == "srcset" {
                parse_srcset(value)
            } else {
                vec![value]
            };

            for reference in references {
                if let Some(url) = resolve_link(reference, &base) {
                    out.push(
                        seen,
                        ExtractedLink {
                            url,
                            source_element: (*element).to_string(),
                            reference: reference.trim().to_string(),
                        },
                    );
                }
            }
        }
    }

    if let Ok(style_selector) = Selector::parse("style") {
        for node in document.select(&style_selector) {
            let css: String = node.text().collect();
            extract_css(&css, &base, "style", out, seen);
        }
    }

    if let Ok(inline_selector) = Selector::parse("[style]") {
        for node in document.select(&inline_selector) {
            if let Some(css) = node.value().attr("style") {
                extract_css(css, &base, node.value().name(), out, seen);
            }
        }
    }

    let total = document.errors.len();
    for error in document.errors.iter().take(MAX_WARNINGS) {
        out.warnings.push(format!("HTML parse error: {}", error));
    }
    if total > MAX_WARNINGS {
        out.warnings
            .push(format!("{} more HTML parse errors", total - MAX_WARNINGS));
    }
}

/// Extracts `url(...)` and `@import` references from CSS text
fn extract_css(
    css: &str,
    base_url: &Url,
    element: &str,
    out: &mut Extraction,
    seen: &mut HashSet<String>,
) {
    let url_refs = css_url_regex().captures_iter(css);
    let import_refs = css_import_regex().captures_iter(css);

    for captures in url_refs.chain(import_refs) {
        let Some(reference) = captures.get(1).map(|m| m.as_str()) else {
            continue;
        };

        if let Some(url) = resolve_link(reference, base_url) {
            out.push(
                seen,
                ExtractedLink {
                    url,
                    source_element: element.to_string(),
                    reference: reference.trim().to_string(),
                },
            );
        }
    }
}

/// Returns the document's `<base href>` resolved against the fetch URL
fn document_base(document: &Html, base_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|node| node.value().attr("href"))
                .and_then(|href| base_url.join(href.trim()).ok())
        })
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or_else(|| base_url.clone())
}

/// Splits a `srcset` value into its candidate URLs
fn parse_srcset(srcset: &str) -> Vec<&str> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .collect()
}

/// Resolves a reference to an absolute URL and validates it
///
/// Returns None if the reference should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only references
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(reference: &str, base_url: &Url) -> Option<Url> {
    let reference = reference.trim();

    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    let lower = reference.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = base_url.join(reference).ok()?;
    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved)
    } else {
        None
    }
}
