//! Persisted entities and their insert forms

use crate::model::limits;
use crate::model::{truncate_chars, ResourceType, ScanStatus};
use crate::url::same_host;
use chrono::{DateTime, Utc};
use url::Url;

/// Authentication material forwarded to the target
///
/// Basic auth wins when a username is present; otherwise a token is sent as
/// a bearer credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    /// The credentials to send to `url` on behalf of `target`
    ///
    /// Only the target's host ever receives them.
    pub fn scoped_to(&self, target: &Url, url: &Url) -> Credentials {
        if same_host(url, target) {
            self.clone()
        } else {
            Credentials::none()
        }
    }
}

/// One crawl campaign against a target URL
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: i64,
    pub target_url: String,
    pub status: ScanStatus,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token: Option<String>,
    pub payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub total_resources_found: u64,
    pub scan_duration_seconds: Option<f64>,
}

impl ScanSession {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            auth_token: self.auth_token.clone(),
        }
    }

    /// Credentials to send to `url`, empty unless it is on the target's host
    pub fn credentials_for(&self, url: &Url) -> Credentials {
        match Url::parse(&self.target_url) {
            Ok(target) => self.credentials().scoped_to(&target, url),
            Err(_) => Credentials::none(),
        }
    }
}

/// Fields supplied when a session is created
#[derive(Debug, Clone, Default)]
pub struct NewScanSession {
    pub target_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token: Option<String>,
    pub payload: Option<String>,
}

impl NewScanSession {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Self::default()
        }
    }
}

/// One discovered asset within a session
#[derive(Debug, Clone)]
pub struct WebResource {
    pub id: i64,
    pub scan_session_id: i64,
    pub url: String,
    pub relative_path: String,
    pub resource_type: ResourceType,
    pub file_extension: String,
    pub content_type: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_downloadable: bool,
    pub download_attempts: u32,
    pub last_download_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
    pub source_element: Option<String>,
}

/// A resource as found by the extractor, before it has an id
#[derive(Debug, Clone)]
pub struct NewWebResource {
    pub scan_session_id: i64,
    pub url: String,
    pub relative_path: String,
    pub resource_type: ResourceType,
    pub file_extension: String,
    pub source_element: Option<String>,
}

impl NewWebResource {
    /// Clamps every bounded column to its size limit
    ///
    /// The URL is left alone; callers reject over-long URLs instead because
    /// truncating it would break the per-session uniqueness key.
    pub fn bounded(mut self) -> Self {
        self.relative_path = truncate_chars(&self.relative_path, limits::RELATIVE_PATH);
        self.file_extension = truncate_chars(&self.file_extension, limits::FILE_EXTENSION);
        self.source_element = self
            .source_element
            .map(|s| truncate_chars(&s, limits::SOURCE_ELEMENT));
        self
    }
}

/// Metadata learned when the pipeline fetches a resource
#[derive(Debug, Clone, Default)]
pub struct ResourceMetadata {
    pub content_type: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub resource_type: Option<ResourceType>,
    pub file_extension: Option<String>,
}

/// Append-only record of one download attempt
#[derive(Debug, Clone)]
pub struct DownloadHistory {
    pub id: i64,
    pub resource_id: i64,
    pub downloaded_at: DateTime<Utc>,
    pub file_size_bytes: Option<u64>,
    pub download_duration_seconds: Option<f64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDownloadHistory {
    pub resource_id: i64,
    pub downloaded_at: DateTime<Utc>,
    pub file_size_bytes: Option<u64>,
    pub download_duration_seconds: Option<f64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl NewDownloadHistory {
    pub fn bounded(mut self) -> Self {
        self.error_message = self
            .error_message
            .map(|s| truncate_chars(&s, limits::DOWNLOAD_ERROR_MESSAGE));
        self.client_ip = self
            .client_ip
            .map(|s| truncate_chars(&s, limits::CLIENT_IP));
        self.user_agent = self
            .user_agent
            .map(|s| truncate_chars(&s, limits::USER_AGENT));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(target_url: &str) -> ScanSession {
        ScanSession {
            id: 1,
            target_url: target_url.to_string(),
            status: ScanStatus::Pending,
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            auth_token: None,
            payload: None,
            created_at: Utc::now(),
            completed_at: None,
            error_message: None,
            total_resources_found: 0,
            scan_duration_seconds: None,
        }
    }

    #[test]
    fn test_credentials_stay_on_target_host() {
        let session = session("https://example.com/");
        let own = Url::parse("https://EXAMPLE.com/private/report.pdf").unwrap();
        let cdn = Url::parse("https://cdn.example.net/lib.js").unwrap();

        assert_eq!(session.credentials_for(&own), session.credentials());
        assert_eq!(session.credentials_for(&cdn), Credentials::none());
    }

    #[test]
    fn test_unparseable_target_gets_no_credentials() {
        let session = session("not a url");
        let url = Url::parse("https://example.com/a.png").unwrap();
        assert_eq!(session.credentials_for(&url), Credentials::none());
    }

    #[test]
    fn test_new_resource_bounded() {
        let resource = NewWebResource {
            scan_session_id: 1,
            url: "https://example.com/a".to_string(),
            relative_path: "p".repeat(2000),
            resource_type: ResourceType::Other,
            file_extension: "verylongextension".to_string(),
            source_element: Some("x".repeat(80)),
        }
        .bounded();

        assert_eq!(resource.relative_path.chars().count(), limits::RELATIVE_PATH);
        assert_eq!(resource.file_extension, "verylongex");
        assert_eq!(resource.source_element.unwrap().len(), limits::SOURCE_ELEMENT);
    }

    #[test]
    fn test_history_bounded() {
        let entry = NewDownloadHistory {
            resource_id: 1,
            downloaded_at: Utc::now(),
            file_size_bytes: None,
            download_duration_seconds: None,
            success: false,
            error_message: Some("e".repeat(900)),
            client_ip: Some("127.0.0.1".to_string()),
            user_agent: None,
        }
        .bounded();

        assert_eq!(
            entry.error_message.unwrap().len(),
            limits::DOWNLOAD_ERROR_MESSAGE
        );
        assert_eq!(entry.client_ip.as_deref(), Some("127.0.0.1"));
    }
}
