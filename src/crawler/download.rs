//! On-demand resource downloads
//!
//! Re-fetches a stored resource, with its session's credentials when it lives
//! on the session's target host, retrying transient failures, and leaves an audit trail: every call bumps the
//! resource's attempt counter once and appends exactly one history row.

use crate::config::{Config, DownloadConfig};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::model::{DownloadHistory, NewDownloadHistory};
use crate::storage::{lock_storage, SharedStorage, Storage};
use crate::Result;
use chrono::Utc;
use std::time::{Duration, Instant};
use url::Url;

/// Caller details recorded with a download
#[derive(Debug, Clone, Default)]
pub struct DownloadContext {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Result of one download call
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// The history row appended for this call
    pub history: DownloadHistory,

    /// The body, when the download succeeded
    pub content: Option<Vec<u8>>,
}

impl DownloadOutcome {
    pub fn succeeded(&self) -> bool {
        self.history.success
    }
}

/// Downloads resources outside of any scan
///
/// Calls for different resources may run concurrently; the only shared
/// state is the storage handle.
pub struct DownloadManager {
    fetcher: Fetcher,
    policy: DownloadConfig,
    storage: SharedStorage,
}

impl DownloadManager {
    pub fn new(config: &Config, storage: SharedStorage) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::from_config(config)?,
            policy: config.download.clone(),
            storage,
        })
    }

    /// Downloads one resource
    ///
    /// # Arguments
    ///
    /// * `resource_id` - The resource to download
    /// * `context` - Client IP and user agent to record
    ///
    /// # Returns
    ///
    /// * `Ok(DownloadOutcome)` - The download ran; check `history.success`
    /// * `Err(ScannerError)` - The resource does not exist or storage failed
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Network error, HTTP 5xx | Retry up to `max-attempts`, doubling the delay |
    /// | 401 / 403, other 4xx | Fail immediately |
    /// | Body too large, redirect error, invalid URL | Fail immediately |
    pub async fn download(
        &self,
        resource_id: i64,
        context: &DownloadContext,
    ) -> Result<DownloadOutcome> {
        let (resource, session) = {
            let storage = lock_storage(&self.storage)?;
            let resource = storage.get_resource(resource_id)?;
            let session = storage.get_session(resource.scan_session_id)?;
            (resource, session)
        };

        let started_at = Utc::now();
        let timer = Instant::now();

        let result = match Url::parse(&resource.url) {
            Ok(url) => {
                let credentials = session.credentials_for(&url);
                self.fetch_with_retry(&url, &credentials).await
            }
            Err(e) => Err(FetchError::InvalidUrl(e.to_string())),
        };
        let elapsed = timer.elapsed().as_secs_f64();

        let (entry, content) = match result {
            Ok(body) => {
                tracing::info!(
                    "Downloaded resource {} ({} bytes in {:.2}s)",
                    resource_id,
                    body.len(),
                    elapsed
                );
                let entry = NewDownloadHistory {
                    resource_id,
                    downloaded_at: started_at,
                    file_size_bytes: Some(body.len() as u64),
                    download_duration_seconds: Some(elapsed),
                    success: true,
                    error_message: None,
                    client_ip: context.client_ip.clone(),
                    user_agent: context.user_agent.clone(),
                };
                (entry, Some(body))
            }
            Err(e) => {
                tracing::warn!("Download of resource {} failed: {}", resource_id, e);
                let entry = NewDownloadHistory {
                    resource_id,
                    downloaded_at: started_at,
                    file_size_bytes: None,
                    download_duration_seconds: Some(elapsed),
                    success: false,
                    error_message: Some(e.to_string()),
                    client_ip: context.client_ip.clone(),
                    user_agent: context.user_agent.clone(),
                };
                (entry, None)
            }
        };

        let history = {
            let mut storage = lock_storage(&self.storage)?;
            storage.record_download_attempt(resource_id, Utc::now())?;
            storage.append_download_history(&entry.bounded())?
        };

        Ok(DownloadOutcome { history, content })
    }

    async fn fetch_with_retry(
        &self,
        url: &Url,
        credentials: &crate::model::Credentials,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.fetcher.fetch(url, credentials, None).await {
                Ok(response) => return Ok(response.body),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = backoff_delay(self.policy.backoff_base_ms, attempt);
                    tracing::debug!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        max_attempts,
                        url,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(base_ms.saturating_mul(factor))
}
