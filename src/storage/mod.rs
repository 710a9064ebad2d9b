//! Storage module for persisting scan data
//!
//! This module handles all database operations for the scanner, including:
//! - SQLite database initialization and schema management
//! - Scan session lifecycle persistence with compare-and-set transitions
//! - Resource deduplication through the `(session, url)` unique constraint
//! - The append-only download history

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{InsertOutcome, Storage, StorageError, StorageResult};

use crate::api::ScanStatusUpdate;
use crate::model::{ScanSession, ScanStatus};
use crate::ScannerError;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared between scan workers
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Wraps a backend for sharing across tasks
pub fn shared(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks a shared backend, surfacing poisoning as a storage error
pub fn lock_storage(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Applies an externally requested status change
///
/// The update must be a legal transition from the session's current status.
/// Terminal updates carry their statistics or error message with them.
pub fn apply_status_update(
    storage: &mut dyn Storage,
    session_id: i64,
    update: &ScanStatusUpdate,
) -> Result<ScanSession, ScannerError> {
    update.validate()?;

    let current = storage.get_session(session_id)?;
    if !current.status.can_transition_to(update.status) {
        return Err(ScannerError::InvalidTransition {
            from: current.status,
            to: update.status,
        });
    }

    let applied = match update.status {
        ScanStatus::InProgress => {
            storage.transition_status(session_id, current.status, ScanStatus::InProgress)?
        }
        ScanStatus::Completed => storage.complete_session(
            session_id,
            update.total_resources_found.unwrap_or(0),
            update.scan_duration_seconds.unwrap_or(0.0),
        )?,
        ScanStatus::Failed => storage.fail_session(
            session_id,
            update.error_message.as_deref().unwrap_or("scan failed"),
            update.scan_duration_seconds,
        )?,
        ScanStatus::Pending => false,
    };

    let refreshed = storage.get_session(session_id)?;
    if !applied {
        return Err(ScannerError::InvalidTransition {
            from: refreshed.status,
            to: update.status,
        });
    }

    Ok(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewScanSession;

    fn update(status: ScanStatus) -> ScanStatusUpdate {
        ScanStatusUpdate {
            status,
            error_message: None,
            total_resources_found: None,
            scan_duration_seconds: None,
        }
    }

    #[test]
    fn test_apply_status_update_walks_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .create_session(&NewScanSession::new("https://example.com"))
            .unwrap();

        let session = apply_status_update(&mut storage, id, &update(ScanStatus::InProgress)).unwrap();
        assert_eq!(session.status, ScanStatus::InProgress);

        let done = ScanStatusUpdate {
            total_resources_found: Some(4),
            scan_duration_seconds: Some(2.0),
            ..update(ScanStatus::Completed)
        };
        let session = apply_status_update(&mut storage, id, &done).unwrap();
        assert_eq!(session.status, ScanStatus::Completed);
        assert_eq!(session.total_resources_found, 4);
    }

    #[test]
    fn test_apply_status_update_rejects_regression() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .create_session(&NewScanSession::new("https://example.com"))
            .unwrap();
        storage.fail_session(id, "boom", None).unwrap();

        let result = apply_status_update(&mut storage, id, &update(ScanStatus::InProgress));
        assert!(matches!(result, Err(ScannerError::InvalidTransition { .. })));
    }

    #[test]
    fn test_shared_lock() {
        let storage = shared(SqliteStorage::new_in_memory().unwrap());
        let guard = lock_storage(&storage).unwrap();
        assert!(guard.list_sessions().unwrap().is_empty());
    }
}
