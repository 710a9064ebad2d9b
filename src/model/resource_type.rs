use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of resource kinds a scan can record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "js")]
    JavaScript,
    #[serde(rename = "xml")]
    Xml,
    #[serde(rename = "yml")]
    Yaml,
    #[serde(rename = "css")]
    Css,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "txt")]
    Text,
    #[serde(rename = "pdf")]
    Pdf,
    #[serde(rename = "other")]
    Other,
}

impl ResourceType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JavaScript => "js",
            Self::Xml => "xml",
            Self::Yaml => "yml",
            Self::Css => "css",
            Self::Image => "image",
            Self::Html => "html",
            Self::Text => "txt",
            Self::Pdf => "pdf",
            Self::Other => "other",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "js" => Some(Self::JavaScript),
            "xml" => Some(Self::Xml),
            "yml" => Some(Self::Yaml),
            "css" => Some(Self::Css),
            "image" => Some(Self::Image),
            "html" => Some(Self::Html),
            "txt" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Extension used when the URL itself carries none
    ///
    /// Images have no single canonical extension, so they fall back to
    /// an empty string like `Other`.
    pub fn canonical_extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JavaScript => "js",
            Self::Xml => "xml",
            Self::Yaml => "yml",
            Self::Css => "css",
            Self::Html => "html",
            Self::Text => "txt",
            Self::Pdf => "pdf",
            Self::Image | Self::Other => "",
        }
    }

    /// True for payloads the extractor can mine for further references
    pub fn is_crawlable(&self) -> bool {
        matches!(self, Self::Html | Self::Css)
    }

    pub fn all_types() -> [Self; 10] {
        [
            Self::Json,
            Self::JavaScript,
            Self::Xml,
            Self::Yaml,
            Self::Css,
            Self::Image,
            Self::Html,
            Self::Text,
            Self::Pdf,
            Self::Other,
        ]
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(&s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown resource type '{}'", s))
    }
}
