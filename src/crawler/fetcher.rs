//! HTTP fetcher implementation
//!
//! This module performs one HTTP retrieval at a time:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Attaching basic or bearer credentials
//! - Sending an optional payload as a POST body
//! - Enforcing the body-size ceiling while streaming
//! - Classifying failures
//!
//! The fetcher never interprets content; that is the extractor's job.

use crate::config::{Config, FetcherConfig, UserAgentConfig};
use crate::model::Credentials;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CONTENT_TYPE, LAST_MODIFIED};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors a fetch can end with
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Timeout, DNS failure, refused connection, broken stream
    #[error("Network error: {0}")]
    Network(String),

    /// The server rejected our credentials (401/403)
    #[error("Authentication rejected: HTTP {0}")]
    Auth(u16),

    /// The body exceeds the configured ceiling
    #[error("Response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// Any other non-success status
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// Redirect loop or too many hops
    #[error("Redirect error: {0}")]
    Redirect(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Returns true for failures worth retrying: network errors and 5xx
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::HttpStatus(status) => *status >= 500,
            _ => false,
        }
    }

    /// Returns true for 4xx responses, authentication rejections included
    pub fn is_client_error(&self) -> bool {
        match self {
            FetchError::Auth(_) => true,
            FetchError::HttpStatus(status) => (400..500).contains(status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_redirect() {
            FetchError::Redirect(e.to_string())
        } else if e.is_builder() {
            FetchError::InvalidUrl(e.to_string())
        } else if e.is_timeout() {
            FetchError::Network("Request timeout".to_string())
        } else if e.is_connect() {
            FetchError::Network(format!("Connection failed: {}", e))
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// A successful response with its body fully read
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,

    /// Final URL after redirects
    pub final_url: Url,

    pub headers: HeaderMap,

    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Content-Type header value, trimmed; `None` when absent or blank
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Parsed Last-Modified header
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.headers
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date)
    }

    /// Size of the body as received
    pub fn body_size(&self) -> u64 {
        self.body.len() as u64
    }
}

/// Performs authenticated HTTP retrievals
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_body_bytes: u64,
}

impl Fetcher {
    /// Builds a fetcher with its own HTTP client
    ///
    /// # Arguments
    ///
    /// * `config` - Timeouts, redirect cap and body ceiling
    /// * `user_agent` - The user agent identification
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Successfully built fetcher
    /// * `Err(reqwest::Error)` - Failed to build the client
    pub fn new(config: &FetcherConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(Policy::limited(config.max_redirects))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.fetcher, &config.user_agent)
    }

    /// Fetches a URL
    ///
    /// # Request Flow
    ///
    /// 1. GET, or POST with `payload` as the body when one is given
    /// 2. Basic auth when a username is present, otherwise bearer when a
    ///    token is present
    /// 3. Redirects followed up to the configured cap
    /// 4. Status check, then the body is streamed up to the ceiling
    ///
    /// # Error Mapping
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | HTTP 401 / 403 | `Auth` |
    /// | Other non-2xx | `HttpStatus` |
    /// | Content-Length or streamed body above ceiling | `TooLarge` |
    /// | Too many redirects | `Redirect` |
    /// | Timeout, DNS, refused connection | `Network` |
    /// | Non-http(s) URL | `InvalidUrl` |
    pub async fn fetch(
        &self,
        url: &Url,
        credentials: &Credentials,
        payload: Option<&str>,
    ) -> Result<FetchResponse, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let mut request = match payload {
            Some(body) => self.client.post(url.clone()).body(body.to_string()),
            None => self.client.get(url.clone()),
        };

        if let Some(username) = &credentials.username {
            request = request.basic_auth(username, credentials.password.as_ref());
        } else if let Some(token) = &credentials.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Auth(status.as_u16()));
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes)
        {
            return Err(FetchError::TooLarge {
                limit: self.max_body_bytes,
            });
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = self.read_body(response).await?;

        tracing::trace!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(FetchResponse {
            status: status.as_u16(),
            final_url,
            headers,
            body,
        })
    }

    /// Streams the body, aborting once it crosses the ceiling
    async fn read_body(&self, mut response: Response) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();

        while let Some(chunk) = response.chunk().await? {
            if body.len() as u64 + chunk.len() as u64 > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

/// Parses an HTTP date (`Wed, 21 Oct 2015 07:28:00 GMT`)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher(max_body_bytes: u64) -> Fetcher {
        let config = FetcherConfig {
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            max_redirects: 2,
            max_body_bytes,
        };
        let user_agent = UserAgentConfig {
            scanner_name: "TestScanner".to_string(),
            scanner_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
        };
        Fetcher::new(&config, &user_agent).unwrap()
    }

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Network("reset".to_string()).is_retryable());
        assert!(FetchError::HttpStatus(503).is_retryable());
        assert!(!FetchError::HttpStatus(404).is_retryable());
        assert!(!FetchError::Auth(401).is_retryable());
        assert!(!FetchError::TooLarge { limit: 1 }.is_retryable());
        assert!(!FetchError::Redirect("loop".to_string()).is_retryable());
        assert!(FetchError::HttpStatus(404).is_client_error());
        assert!(FetchError::Auth(403).is_client_error());
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2015-10-21T07:28:00+00:00");
        assert!(parse_http_date("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_fetch_success_with_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("user-agent", "TestScanner/1.0 (+https://example.com/about)"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT")
                    .set_body_raw("<html></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let fetcher = test_fetcher(1024);
        let response = fetcher
            .fetch(&url(&server, "/"), &Credentials::none(), None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(response
            .content_type()
            .is_some_and(|ct| ct.starts_with("text/html")));
        assert!(response.last_modified().is_some());
        assert_eq!(response.body, b"<html></html>");
        assert_eq!(response.body_size(), 13);
    }

    #[tokio::test]
    async fn test_basic_auth_and_payload() {
        let server = MockServer::start().await;
        // "user:pass" in base64
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .and(body_string("q=1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let credentials = Credentials {
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            auth_token: Some("ignored".to_string()),
        };
        let fetcher = test_fetcher(1024);
        let response = fetcher
            .fetch(&url(&server, "/login"), &credentials, Some("q=1"))
            .await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let credentials = Credentials {
            auth_token: Some("tok".to_string()),
            ..Credentials::default()
        };
        let fetcher = test_fetcher(1024);
        assert!(fetcher
            .fetch(&url(&server, "/"), &credentials, None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_status_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/private"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let fetcher = test_fetcher(1024);
        let none = Credentials::none();
        assert_eq!(
            fetcher.fetch(&url(&server, "/private"), &none, None).await.unwrap_err(),
            FetchError::Auth(401)
        );
        assert_eq!(
            fetcher.fetch(&url(&server, "/forbidden"), &none, None).await.unwrap_err(),
            FetchError::Auth(403)
        );
        assert_eq!(
            fetcher.fetch(&url(&server, "/missing"), &none, None).await.unwrap_err(),
            FetchError::HttpStatus(404)
        );
        assert_eq!(
            fetcher.fetch(&url(&server, "/broken"), &none, None).await.unwrap_err(),
            FetchError::HttpStatus(502)
        );
    }

    #[tokio::test]
    async fn test_body_ceiling() {
        let server = MockServer::start().await;
        Mock::given(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
            .mount(&server)
            .await;

        let fetcher = test_fetcher(1024);
        let err = fetcher
            .fetch(&url(&server, "/big"), &Credentials::none(), None)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::TooLarge { limit: 1024 });
    }

    #[tokio::test]
    async fn test_redirect_cap() {
        let server = MockServer::start().await;
        Mock::given(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&server)
            .await;

        let fetcher = test_fetcher(1024);
        let err = fetcher
            .fetch(&url(&server, "/loop"), &Credentials::none(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Redirect(_)));
    }

    #[tokio::test]
    async fn test_redirect_followed() {
        let server = MockServer::start().await;
        Mock::given(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = test_fetcher(1024);
        let response = fetcher
            .fetch(&url(&server, "/old"), &Credentials::none(), None)
            .await
            .unwrap();
        assert_eq!(response.final_url.path(), "/new");
    }

    /// A URL on a local port nothing listens on
    fn closed_port_url() -> Url {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap()
    }

    #[tokio::test]
    async fn test_connection_refused_is_network() {
        let dead = closed_port_url();

        let fetcher = test_fetcher(1024);
        let err = fetcher
            .fetch(&dead, &Credentials::none(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let fetcher = test_fetcher(1024);
        let ftp = Url::parse("ftp://example.com/file").unwrap();
        let err = fetcher
            .fetch(&ftp, &Credentials::none(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
