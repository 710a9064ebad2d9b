use crate::model::limits;
use crate::model::{ResourceType, WebResource};
use crate::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

/// Resource listing filter
///
/// Every present criterion must hold for a resource to match; absent
/// criteria match everything. Empty sets count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceFilter {
    #[serde(default)]
    pub resource_types: Option<Vec<ResourceType>>,
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,
    #[serde(default)]
    pub min_file_size: Option<u64>,
    #[serde(default)]
    pub max_file_size: Option<u64>,
    #[serde(default)]
    pub is_downloadable: Option<bool>,
    #[serde(default)]
    pub search_query: Option<String>,
}

impl ResourceFilter {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(query) = &self.search_query {
            if query.chars().count() > limits::SEARCH_QUERY {
                return Err(ValidationError::TooLong {
                    field: "search_query",
                    max: limits::SEARCH_QUERY,
                });
            }
        }

        if let (Some(min), Some(max)) = (self.min_file_size, self.max_file_size) {
            if min > max {
                return Err(ValidationError::OutOfRange {
                    field: "min_file_size",
                    reason: format!("{} is greater than max_file_size {}", min, max),
                });
            }
        }

        Ok(())
    }

    /// Returns true if the resource satisfies every present criterion
    ///
    /// Size bounds are inclusive. A resource of unknown size never matches a
    /// size bound.
    pub fn matches(&self, resource: &WebResource) -> bool {
        if let Some(types) = self.resource_types.as_ref().filter(|t| !t.is_empty()) {
            if !types.contains(&resource.resource_type) {
                return false;
            }
        }

        if let Some(extensions) = self.file_extensions.as_ref().filter(|e| !e.is_empty()) {
            let matched = extensions.iter().any(|ext| {
                ext.trim_start_matches('.')
                    .eq_ignore_ascii_case(&resource.file_extension)
            });
            if !matched {
                return false;
            }
        }

        if self.min_file_size.is_some() || self.max_file_size.is_some() {
            let Some(size) = resource.file_size_bytes else {
                return false;
            };
            if self.min_file_size.is_some_and(|min| size < min) {
                return false;
            }
            if self.max_file_size.is_some_and(|max| size > max) {
                return false;
            }
        }

        if let Some(downloadable) = self.is_downloadable {
            if resource.is_downloadable != downloadable {
                return false;
            }
        }

        if let Some(query) = self.search_query.as_deref().map(str::trim) {
            if !query.is_empty() {
                let needle = query.to_lowercase();
                let found = resource.url.to_lowercase().contains(&needle)
                    || resource.relative_path.to_lowercase().contains(&needle);
                if !found {
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn resource(url: &str, ty: ResourceType, ext: &str, size: Option<u64>) -> WebResource {
        WebResource {
            id: 1,
            scan_session_id: 1,
            url: url.to_string(),
            relative_path: url.trim_start_matches("https://example.com").to_string(),
            resource_type: ty,
            file_extension: ext.to_string(),
            content_type: None,
            file_size_bytes: size,
            last_modified: None,
            is_downloadable: true,
            download_attempts: 0,
            last_download_at: None,
            discovered_at: Utc::now(),
            source_element: None,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ResourceFilter::default();
        assert!(filter.matches(&resource(
            "https://example.com/a.png",
            ResourceType::Image,
            "png",
            None
        )));
    }

    #[test]
    fn test_type_filter() {
        let filter = ResourceFilter {
            resource_types: Some(vec![ResourceType::Css, ResourceType::JavaScript]),
            ..ResourceFilter::default()
        };
        let js = resource("https://example.com/a.js", ResourceType::JavaScript, "js", None);
        let png = resource("https://example.com/a.png", ResourceType::Image, "png", None);
        assert!(filter.matches(&js));
        assert!(!filter.matches(&png));
    }

    #[test]
    fn test_extension_filter_ignores_dot_and_case() {
        let filter = ResourceFilter {
            file_extensions: Some(vec![".PNG".to_string()]),
            ..ResourceFilter::default()
        };
        assert!(filter.matches(&resource(
            "https://example.com/a.png",
            ResourceType::Image,
            "png",
            None
        )));
    }

    #[test]
    fn test_size_range_is_inclusive_and_needs_size() {
        let filter = ResourceFilter {
            min_file_size: Some(100),
            max_file_size: Some(200),
            ..ResourceFilter::default()
        };
        let url = "https://example.com/a.png";
        assert!(filter.matches(&resource(url, ResourceType::Image, "png", Some(100))));
        assert!(filter.matches(&resource(url, ResourceType::Image, "png", Some(200))));
        assert!(!filter.matches(&resource(url, ResourceType::Image, "png", Some(201))));
        assert!(!filter.matches(&resource(url, ResourceType::Image, "png", None)));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let filter = ResourceFilter {
            resource_types: Some(vec![ResourceType::Image]),
            search_query: Some("LOGO".to_string()),
            is_downloadable: Some(true),
            ..ResourceFilter::default()
        };
        let logo = resource("https://example.com/img/logo.png", ResourceType::Image, "png", None);
        let banner = resource("https://example.com/img/banner.png", ResourceType::Image, "png", None);
        let logo_css = resource("https://example.com/logo.css", ResourceType::Css, "css", None);

        assert!(filter.matches(&logo));
        assert!(!filter.matches(&banner));
        assert!(!filter.matches(&logo_css));
    }

    #[test]
    fn test_downloadable_filter() {
        let filter = ResourceFilter {
            is_downloadable: Some(false),
            ..ResourceFilter::default()
        };
        let mut r = resource("https://example.com/a", ResourceType::Other, "", None);
        assert!(!filter.matches(&r));
        r.is_downloadable = false;
        assert!(filter.matches(&r));
    }

    #[test]
    fn test_validate() {
        let bad_range = ResourceFilter {
            min_file_size: Some(10),
            max_file_size: Some(5),
            ..ResourceFilter::default()
        };
        assert!(bad_range.validate().is_err());

        let long_query = ResourceFilter {
            search_query: Some("q".repeat(256)),
            ..ResourceFilter::default()
        };
        assert!(long_query.validate().is_err());

        assert!(ResourceFilter::default().validate().is_ok());
    }
}
