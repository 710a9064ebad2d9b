//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{
    DownloadHistory, NewDownloadHistory, NewScanSession, NewWebResource, ResourceMetadata,
    ResourceType, ScanSession, ScanStatus, WebResource,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Scan session not found: {0}")]
    SessionNotFound(i64),

    #[error("Resource not found: {0}")]
    ResourceNotFound(i64),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: ScanStatus, to: ScanStatus },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of an insert-if-absent on the `(session, url)` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was stored with this id
    Inserted(i64),

    /// The session already has a row for this URL
    Duplicate,

    /// The session already holds the maximum number of resources
    LimitReached,
}

/// Trait for storage backend implementations
///
/// This trait defines every database operation the scan pipeline, the
/// download manager and the CLI need. Mutating operations take `&mut self`;
/// callers sharing a backend across tasks wrap it in a mutex.
pub trait Storage {
    // ===== Session Management =====

    /// Creates a new session in `pending` state and returns its id
    fn create_session(&mut self, session: &NewScanSession) -> StorageResult<i64>;

    /// Gets a session by ID
    fn get_session(&self, session_id: i64) -> StorageResult<ScanSession>;

    /// Lists all sessions, newest first
    fn list_sessions(&self) -> StorageResult<Vec<ScanSession>>;

    /// Compare-and-set a non-terminal status change
    ///
    /// Returns `Ok(false)` when the session is no longer in `from`.
    fn transition_status(
        &mut self,
        session_id: i64,
        from: ScanStatus,
        to: ScanStatus,
    ) -> StorageResult<bool>;

    /// Moves an `in_progress` session to `completed` with its statistics
    ///
    /// Returns `Ok(false)` if the session was not `in_progress`.
    fn complete_session(
        &mut self,
        session_id: i64,
        total_resources_found: u64,
        scan_duration_seconds: f64,
    ) -> StorageResult<bool>;

    /// Moves a non-terminal session to `failed`
    ///
    /// The message is truncated to the column bound. Returns `Ok(false)` if
    /// the session was already terminal.
    fn fail_session(
        &mut self,
        session_id: i64,
        error_message: &str,
        scan_duration_seconds: Option<f64>,
    ) -> StorageResult<bool>;

    /// Deletes a session and, by cascade, its resources and their history
    fn delete_session(&mut self, session_id: i64) -> StorageResult<()>;

    // ===== Resource Management =====

    /// Inserts a resource unless the session already has one for its URL
    ///
    /// The unique constraint decides; when `max_resources` is given the
    /// count check happens in the same critical section as the insert.
    fn insert_resource(
        &mut self,
        resource: &NewWebResource,
        max_resources: Option<u64>,
    ) -> StorageResult<InsertOutcome>;

    /// Records what the pipeline learned by fetching a resource
    fn update_resource_metadata(
        &mut self,
        session_id: i64,
        url: &str,
        metadata: &ResourceMetadata,
    ) -> StorageResult<()>;

    /// Flags a resource as (not) downloadable
    fn set_downloadable(
        &mut self,
        session_id: i64,
        url: &str,
        downloadable: bool,
    ) -> StorageResult<()>;

    /// Gets a resource by ID
    fn get_resource(&self, resource_id: i64) -> StorageResult<WebResource>;

    /// Gets a resource by its session and URL
    fn get_resource_by_url(&self, session_id: i64, url: &str)
        -> StorageResult<Option<WebResource>>;

    /// Lists all resources of a session in discovery order
    fn list_resources(&self, session_id: i64) -> StorageResult<Vec<WebResource>>;

    /// Counts the resources of a session
    fn count_resources(&self, session_id: i64) -> StorageResult<u64>;

    /// Counts the resources of a session per type
    fn count_resources_by_type(&self, session_id: i64)
        -> StorageResult<HashMap<ResourceType, u64>>;

    /// Increments `download_attempts` by one and sets `last_download_at`
    fn record_download_attempt(
        &mut self,
        resource_id: i64,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;

    // ===== Download History =====

    /// Appends a download-history row and returns it as stored
    fn append_download_history(
        &mut self,
        entry: &NewDownloadHistory,
    ) -> StorageResult<DownloadHistory>;

    /// Lists the history of a resource, oldest first
    fn list_download_history(&self, resource_id: i64) -> StorageResult<Vec<DownloadHistory>>;
}
