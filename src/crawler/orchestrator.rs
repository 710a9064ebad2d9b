//! Scan orchestrator - main scan execution logic
//!
//! This module drives one scan session from `pending` to a terminal state:
//! - Claiming the session with a compare-and-set transition
//! - Fetching the target and seeding the frontier from it
//! - Running a bounded pool of workers that fetch, classify and extract
//! - Stopping on exhaustion, the resource limit, or the time budget
//! - Finalizing the session with its statistics or its error

use crate::config::{Config, ScannerConfig};
use crate::crawler::classifier::classify;
use crate::crawler::extractor::{extract, Extraction};
use crate::crawler::fetcher::{FetchError, FetchResponse, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::model::limits;
use crate::model::{Credentials, NewWebResource, ResourceMetadata, ScanStatus};
use crate::storage::{lock_storage, InsertOutcome, SharedStorage, Storage};
use crate::url::{normalize_parsed, normalize_url, relative_path, same_host};
use crate::{Result, ScannerError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// Everything the workers of one scan share
struct ScanContext {
    session_id: i64,
    target: Url,
    /// Where the target fetch landed after redirects
    landing: Url,
    credentials: Credentials,
    scanner: ScannerConfig,
    fetcher: Fetcher,
    frontier: Frontier,
    storage: SharedStorage,
}

impl ScanContext {
    fn in_scope(&self, url: &Url) -> bool {
        self.scanner.follow_external || same_host(url, &self.target)
    }

    /// Stores every new reference of an extraction and queues the in-scope ones
    ///
    /// The unique `(session, url)` constraint decides which worker owns a URL
    /// that several pages reference; only the winning insert enqueues it.
    fn record_links(&self, source: &Url, extraction: Extraction) -> Result<()> {
        for warning in &extraction.warnings {
            tracing::debug!("{}: {}", source, warning);
        }

        for link in extraction.links {
            if self.frontier.is_cancelled() {
                break;
            }

            let url = match normalize_parsed(link.url) {
                Ok(u) => u,
                Err(e) => {
                    tracing::debug!("Skipping reference {}: {}", link.reference, e);
                    continue;
                }
            };

            if url == self.target || url == self.landing {
                continue;
            }

            if url.as_str().chars().count() > limits::RESOURCE_URL {
                tracing::debug!(
                    "Skipping URL longer than {} characters from {}",
                    limits::RESOURCE_URL,
                    source
                );
                continue;
            }

            let (resource_type, file_extension) = classify(url.as_str(), None);
            let resource = NewWebResource {
                scan_session_id: self.session_id,
                url: url.as_str().to_string(),
                relative_path: relative_path(&self.target, &url, &link.reference),
                resource_type,
                file_extension,
                source_element: Some(link.source_element),
            }
            .bounded();

            let outcome = {
                let mut storage = lock_storage(&self.storage)?;
                storage.insert_resource(&resource, Some(self.scanner.max_resources))?
            };

            match outcome {
                InsertOutcome::Inserted(id) => {
                    tracing::trace!("Discovered resource {} ({})", id, url);
                    if self.in_scope(&url) {
                        self.frontier.push(url);
                    }
                }
                InsertOutcome::Duplicate => {}
                InsertOutcome::LimitReached => {
                    tracing::info!(
                        "Session {} reached the limit of {} resources",
                        self.session_id,
                        self.scanner.max_resources
                    );
                    self.frontier.cancel();
                    break;
                }
            }
        }

        Ok(())
    }

    /// Fetches one discovered resource, records its metadata and follows it
    ///
    /// Fetch failures only affect this resource. Storage failures are
    /// returned and end the scan.
    async fn process(&self, url: &Url) -> Result<()> {
        let credentials = self.credentials.scoped_to(&self.target, url);

        let response = match self.fetcher.fetch(url, &credentials, None).await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Failed to fetch {}: {}", url, e);
                if e.is_client_error() {
                    let mut storage = lock_storage(&self.storage)?;
                    storage.set_downloadable(self.session_id, url.as_str(), false)?;
                }
                return Ok(());
            }
        };

        tracing::trace!("HTTP {} for {}", response.status, url);

        let content_type = response.content_type();
        let (resource_type, file_extension) = classify(url.as_str(), content_type);
        let metadata = ResourceMetadata {
            content_type: content_type.map(str::to_string),
            file_size_bytes: Some(response.body_size()),
            last_modified: response.last_modified(),
            resource_type: Some(resource_type),
            file_extension: Some(file_extension),
        };

        {
            let mut storage = lock_storage(&self.storage)?;
            storage.update_resource_metadata(self.session_id, url.as_str(), &metadata)?;
        }

        if resource_type.is_crawlable() && !self.frontier.is_cancelled() {
            self.follow(&response)?;
        }

        Ok(())
    }

    fn follow(&self, response: &FetchResponse) -> Result<()> {
        let extraction = extract(
            &response.final_url,
            response.content_type(),
            &response.body,
        );
        self.record_links(&response.final_url, extraction)
    }
}

/// Worker loop: fetch until the frontier runs dry or is cancelled
async fn run_worker(worker_id: usize, context: Arc<ScanContext>) -> Result<()> {
    let mut processed = 0usize;

    while let Some(url) = context.frontier.next().await {
        let result = context.process(&url).await;
        context.frontier.complete();

        if let Err(e) = result {
            tracing::error!("Worker {} stopping on {}: {}", worker_id, url, e);
            context.frontier.cancel();
            return Err(e);
        }
        processed += 1;
    }

    tracing::debug!("Worker {} finished after {} fetches", worker_id, processed);
    Ok(())
}

/// Drives scan sessions from `pending` to a terminal state
pub struct ScanOrchestrator {
    config: Arc<Config>,
    storage: SharedStorage,
    fetcher: Fetcher,
}

impl ScanOrchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `config` - The scanner configuration
    /// * `storage` - Storage shared with the rest of the process
    ///
    /// # Returns
    ///
    /// * `Ok(ScanOrchestrator)` - Ready to run scans
    /// * `Err(ScannerError)` - The HTTP client could not be built
    pub fn new(config: Config, storage: SharedStorage) -> Result<Self> {
        let fetcher = Fetcher::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            storage,
            fetcher,
        })
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Runs a scan session to completion
    ///
    /// # Flow
    ///
    /// 1. `pending -> in_progress` compare-and-set; losing it is an error
    /// 2. Fetch the target with the session's credentials and payload; any
    ///    failure here fails the session
    /// 3. Seed the frontier from the target's references
    /// 4. Run `max-workers` workers until the frontier is exhausted, the
    ///    resource limit trips, or `max-duration-secs` elapses
    /// 5. `completed` with the stored row count, or `failed` if storage broke
    ///
    /// # Returns
    ///
    /// * `Ok(ScanStatus)` - The terminal status the session ended in
    /// * `Err(ScannerError)` - The session was not pending, or storage failed
    ///   before the session could be finalized
    pub async fn start(&self, session_id: i64) -> Result<ScanStatus> {
        let session = {
            let mut storage = lock_storage(&self.storage)?;
            let session = storage.get_session(session_id)?;
            if session.status != ScanStatus::Pending {
                return Err(ScannerError::SessionNotPending(session_id));
            }
            if !storage.transition_status(session_id, ScanStatus::Pending, ScanStatus::InProgress)? {
                return Err(ScannerError::SessionNotPending(session_id));
            }
            session
        };

        let started = Instant::now();
        tracing::info!("Starting scan {} of {}", session_id, session.target_url);

        let target = match normalize_url(&session.target_url) {
            Ok(t) => t,
            Err(e) => {
                return self.fail(session_id, &format!("Invalid target URL: {}", e), started);
            }
        };

        let credentials = session.credentials();
        let response = match self
            .fetcher
            .fetch(&target, &credentials, session.payload.as_deref())
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Target fetch failed for scan {}: {}", session_id, e);
                return self.fail(session_id, &target_failure_message(&e), started);
            }
        };

        let landing = normalize_parsed(response.final_url.clone()).unwrap_or_else(|_| target.clone());
        let context = Arc::new(ScanContext {
            session_id,
            target: target.clone(),
            landing: landing.clone(),
            credentials,
            scanner: self.config.scanner.clone(),
            fetcher: self.fetcher.clone(),
            frontier: Frontier::new(),
            storage: Arc::clone(&self.storage),
        });

        context.frontier.mark_seen(&target);
        context.frontier.mark_seen(&landing);
        if let Err(e) = context.follow(&response) {
            return self.fail(session_id, &e.to_string(), started);
        }

        let fatal = self.run_workers(&context, started).await;

        let duration = started.elapsed().as_secs_f64();
        if let Some(e) = fatal {
            return self.fail(session_id, &e.to_string(), started);
        }

        tracing::debug!(
            "Scan {} saw {} URLs, {} left queued",
            session_id,
            context.frontier.seen_count(),
            context.frontier.queued()
        );

        let finished = {
            let mut storage = lock_storage(&self.storage)?;
            storage.count_resources(session_id).and_then(|total| {
                storage
                    .complete_session(session_id, total, duration)
                    .map(|_| total)
            })
        };

        let total = match finished {
            Ok(total) => total,
            Err(e) => {
                let message = format!("Failed to finalize scan: {}", e);
                if let Err(fail_err) = self.fail(session_id, &message, started) {
                    tracing::error!("Scan {} left unfinalized: {}", session_id, fail_err);
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            "Scan {} completed: {} resources in {:.2}s",
            session_id,
            total,
            duration
        );

        Ok(ScanStatus::Completed)
    }

    /// Spawns the worker pool and waits for it, enforcing the time budget
    ///
    /// Returns the first error a worker stopped on.
    async fn run_workers(&self, context: &Arc<ScanContext>, started: Instant) -> Option<ScannerError> {
        let max_workers = self.config.scanner.max_workers.max(1) as usize;
        let budget = Duration::from_secs(self.config.scanner.max_duration_secs);

        let mut workers = JoinSet::new();
        for worker_id in 0..max_workers {
            workers.spawn(run_worker(worker_id, Arc::clone(context)));
        }

        let deadline = tokio::time::sleep(budget.saturating_sub(started.elapsed()));
        tokio::pin!(deadline);

        let mut timed_out = false;
        let mut fatal = None;

        loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    None => break,
                    Some(Ok(Ok(()))) => {}
                    Some(Ok(Err(e))) => {
                        fatal.get_or_insert(e);
                    }
                    Some(Err(e)) => {
                        tracing::error!("Scan worker panicked: {}", e);
                        context.frontier.cancel();
                    }
                },
                _ = &mut deadline, if !timed_out => {
                    tracing::info!(
                        "Scan {} hit its {}s time budget",
                        context.session_id,
                        budget.as_secs()
                    );
                    timed_out = true;
                    context.frontier.cancel();
                }
            }
        }

        fatal
    }

    fn fail(&self, session_id: i64, message: &str, started: Instant) -> Result<ScanStatus> {
        let mut storage = lock_storage(&self.storage)?;
        storage.fail_session(session_id, message, Some(started.elapsed().as_secs_f64()))?;
        tracing::warn!("Scan {} failed: {}", session_id, message);
        Ok(ScanStatus::Failed)
    }
}

fn target_failure_message(error: &FetchError) -> String {
    match error {
        FetchError::Auth(status) => {
            format!("Target rejected the supplied credentials (HTTP {})", status)
        }
        other => format!("Failed to fetch target: {}", other),
    }
}

/// Creates a session for `target_url` and runs it
///
/// # Example
///
/// ```no_run
/// use web_resource_scanner::config::Config;
/// use web_resource_scanner::crawler::run_scan;
/// use web_resource_scanner::storage::{shared, SqliteStorage};
/// use web_resource_scanner::ScanRequest;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = shared(SqliteStorage::new_in_memory()?);
/// let (id, status) = run_scan(Config::default(), storage, ScanRequest::new("https://example.com")).await?;
/// println!("scan {} ended {}", id, status);
/// # Ok(())
/// # }
/// ```
pub async fn run_scan(
    config: Config,
    storage: SharedStorage,
    request: crate::api::ScanRequest,
) -> Result<(i64, ScanStatus)> {
    let new_session = request.into_new_session()?;
    let session_id = {
        let mut guard = lock_storage(&storage)?;
        guard.create_session(&new_session)?
    };

    let orchestrator = ScanOrchestrator::new(config, storage)?;
    let status = orchestrator.start(session_id).await?;
    Ok((session_id, status))
}
