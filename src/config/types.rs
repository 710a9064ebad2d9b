use serde::Deserialize;

/// Main configuration structure for the scanner
///
/// Every section is optional in the TOML file; missing sections fall back
/// to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Scan orchestration limits
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScannerConfig {
    /// Number of concurrent fetch workers per scan
    pub max_workers: u32,

    /// Stop discovering once this many resources are stored for a session
    pub max_resources: u64,

    /// Wall-clock budget for a scan (seconds)
    pub max_duration_secs: u64,

    /// Fetch resources on hosts other than the target's
    pub follow_external: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            max_resources: 5000,
            max_duration_secs: 600,
            follow_external: false,
        }
    }
}

/// Per-request HTTP behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetcherConfig {
    /// Whole-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Redirect hops followed before giving up
    pub max_redirects: usize,

    /// Response bodies larger than this are rejected
    pub max_body_bytes: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 5,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Download manager retry policy
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DownloadConfig {
    /// Total fetch attempts per download call, including the first
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further retry (milliseconds)
    pub backoff_base_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 500,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UserAgentConfig {
    pub scanner_name: String,
    pub scanner_version: String,
    /// URL with information about the scanner
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            scanner_name: "WebResourceScanner".to_string(),
            scanner_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/scanner".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Format: ScannerName/Version (+ContactURL)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.scanner_name, self.scanner_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./scanner.db".to_string(),
        }
    }
}
