//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::limits;
use crate::model::{
    truncate_chars, DownloadHistory, NewDownloadHistory, NewScanSession, NewWebResource,
    ResourceMetadata, ResourceType, ScanSession, ScanStatus, WebResource,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{InsertOutcome, Storage, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const SESSION_COLUMNS: &str = "id, target_url, status, username, password, auth_token, payload,
     created_at, completed_at, error_message, total_resources_found, scan_duration_seconds";

const RESOURCE_COLUMNS: &str = "id, scan_session_id, url, relative_path, resource_type,
     file_extension, content_type, file_size_bytes, last_modified, is_downloadable,
     download_attempts, last_download_at, discovered_at, source_element";

const HISTORY_COLUMNS: &str = "id, resource_id, downloaded_at, file_size_bytes,
     download_duration_seconds, success, error_message, client_ip, user_agent";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_timestamp(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(idx, v)).transpose()
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ScanSession> {
    let status: String = row.get(2)?;
    Ok(ScanSession {
        id: row.get(0)?,
        target_url: row.get(1)?,
        status: ScanStatus::from_db_string(&status)
            .ok_or_else(|| conversion_error(2, format!("unknown scan status '{}'", status)))?,
        username: row.get(3)?,
        password: row.get(4)?,
        auth_token: row.get(5)?,
        payload: row.get(6)?,
        created_at: parse_timestamp(7, row.get(7)?)?,
        completed_at: parse_optional_timestamp(8, row.get(8)?)?,
        error_message: row.get(9)?,
        total_resources_found: row.get::<_, i64>(10)? as u64,
        scan_duration_seconds: row.get(11)?,
    })
}

fn resource_from_row(row: &Row<'_>) -> rusqlite::Result<WebResource> {
    let resource_type: String = row.get(4)?;
    Ok(WebResource {
        id: row.get(0)?,
        scan_session_id: row.get(1)?,
        url: row.get(2)?,
        relative_path: row.get(3)?,
        resource_type: ResourceType::from_db_string(&resource_type).ok_or_else(|| {
            conversion_error(4, format!("unknown resource type '{}'", resource_type))
        })?,
        file_extension: row.get(5)?,
        content_type: row.get(6)?,
        file_size_bytes: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
        last_modified: parse_optional_timestamp(8, row.get(8)?)?,
        is_downloadable: row.get(9)?,
        download_attempts: row.get(10)?,
        last_download_at: parse_optional_timestamp(11, row.get(11)?)?,
        discovered_at: parse_timestamp(12, row.get(12)?)?,
        source_element: row.get(13)?,
    })
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<DownloadHistory> {
    Ok(DownloadHistory {
        id: row.get(0)?,
        resource_id: row.get(1)?,
        downloaded_at: parse_timestamp(2, row.get(2)?)?,
        file_size_bytes: row.get::<_, Option<i64>>(3)?.map(|v| v as u64),
        download_duration_seconds: row.get(4)?,
        success: row.get(5)?,
        error_message: row.get(6)?,
        client_ip: row.get(7)?,
        user_agent: row.get(8)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Session Management =====

    fn create_session(&mut self, session: &NewScanSession) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO scan_sessions
             (target_url, status, username, password, auth_token, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.target_url,
                ScanStatus::Pending.to_db_string(),
                session.username,
                session.password,
                session.auth_token,
                session.payload,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_session(&self, session_id: i64) -> StorageResult<ScanSession> {
        let sql = format!("SELECT {} FROM scan_sessions WHERE id = ?1", SESSION_COLUMNS);
        self.conn
            .query_row(&sql, params![session_id], session_from_row)
            .optional()?
            .ok_or(StorageError::SessionNotFound(session_id))
    }

    fn list_sessions(&self) -> StorageResult<Vec<ScanSession>> {
        let sql = format!("SELECT {} FROM scan_sessions ORDER BY id DESC", SESSION_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let sessions = stmt
            .query_map([], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn transition_status(
        &mut self,
        session_id: i64,
        from: ScanStatus,
        to: ScanStatus,
    ) -> StorageResult<bool> {
        if !from.can_transition_to(to) || to.is_terminal() {
            return Err(StorageError::InvalidTransition { from, to });
        }

        let changed = self.conn.execute(
            "UPDATE scan_sessions SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![to.to_db_string(), session_id, from.to_db_string()],
        )?;
        Ok(changed == 1)
    }

    fn complete_session(
        &mut self,
        session_id: i64,
        total_resources_found: u64,
        scan_duration_seconds: f64,
    ) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE scan_sessions
             SET status = ?1, completed_at = ?2, total_resources_found = ?3,
                 scan_duration_seconds = ?4
             WHERE id = ?5 AND status = ?6",
            params![
                ScanStatus::Completed.to_db_string(),
                now,
                total_resources_found as i64,
                scan_duration_seconds,
                session_id,
                ScanStatus::InProgress.to_db_string()
            ],
        )?;
        Ok(changed == 1)
    }

    fn fail_session(
        &mut self,
        session_id: i64,
        error_message: &str,
        scan_duration_seconds: Option<f64>,
    ) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let message = truncate_chars(error_message, limits::SESSION_ERROR_MESSAGE);
        let changed = self.conn.execute(
            "UPDATE scan_sessions
             SET status = ?1, completed_at = ?2, error_message = ?3,
                 scan_duration_seconds = COALESCE(?4, scan_duration_seconds)
             WHERE id = ?5 AND status IN (?6, ?7)",
            params![
                ScanStatus::Failed.to_db_string(),
                now,
                message,
                scan_duration_seconds,
                session_id,
                ScanStatus::Pending.to_db_string(),
                ScanStatus::InProgress.to_db_string()
            ],
        )?;
        Ok(changed == 1)
    }

    fn delete_session(&mut self, session_id: i64) -> StorageResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM scan_sessions WHERE id = ?1", params![session_id])?;
        if changed == 0 {
            return Err(StorageError::SessionNotFound(session_id));
        }
        Ok(())
    }

    // ===== Resource Management =====

    fn insert_resource(
        &mut self,
        resource: &NewWebResource,
        max_resources: Option<u64>,
    ) -> StorageResult<InsertOutcome> {
        if let Some(max) = max_resources {
            if self.count_resources(resource.scan_session_id)? >= max {
                let exists = self
                    .get_resource_by_url(resource.scan_session_id, &resource.url)?
                    .is_some();
                return Ok(if exists {
                    InsertOutcome::Duplicate
                } else {
                    InsertOutcome::LimitReached
                });
            }
        }

        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "INSERT INTO web_resources
             (scan_session_id, url, relative_path, resource_type, file_extension,
              discovered_at, source_element)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(scan_session_id, url) DO NOTHING",
            params![
                resource.scan_session_id,
                resource.url,
                resource.relative_path,
                resource.resource_type.to_db_string(),
                resource.file_extension,
                now,
                resource.source_element
            ],
        )?;

        if changed == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted(self.conn.last_insert_rowid()))
        }
    }

    fn update_resource_metadata(
        &mut self,
        session_id: i64,
        url: &str,
        metadata: &ResourceMetadata,
    ) -> StorageResult<()> {
        let content_type = metadata
            .content_type
            .as_deref()
            .map(|ct| truncate_chars(ct, limits::CONTENT_TYPE));
        let extension = metadata
            .file_extension
            .as_deref()
            .map(|ext| truncate_chars(ext, limits::FILE_EXTENSION));

        self.conn.execute(
            "UPDATE web_resources
             SET content_type = COALESCE(?1, content_type),
                 file_size_bytes = COALESCE(?2, file_size_bytes),
                 last_modified = COALESCE(?3, last_modified),
                 resource_type = COALESCE(?4, resource_type),
                 file_extension = COALESCE(?5, file_extension)
             WHERE scan_session_id = ?6 AND url = ?7",
            params![
                content_type,
                metadata.file_size_bytes.map(|v| v as i64),
                metadata.last_modified.map(|t| t.to_rfc3339()),
                metadata.resource_type.map(|t| t.to_db_string()),
                extension,
                session_id,
                url
            ],
        )?;
        Ok(())
    }

    fn set_downloadable(
        &mut self,
        session_id: i64,
        url: &str,
        downloadable: bool,
    ) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE web_resources SET is_downloadable = ?1
             WHERE scan_session_id = ?2 AND url = ?3",
            params![downloadable, session_id, url],
        )?;
        Ok(())
    }

    fn get_resource(&self, resource_id: i64) -> StorageResult<WebResource> {
        let sql = format!("SELECT {} FROM web_resources WHERE id = ?1", RESOURCE_COLUMNS);
        self.conn
            .query_row(&sql, params![resource_id], resource_from_row)
            .optional()?
            .ok_or(StorageError::ResourceNotFound(resource_id))
    }

    fn get_resource_by_url(
        &self,
        session_id: i64,
        url: &str,
    ) -> StorageResult<Option<WebResource>> {
        let sql = format!(
            "SELECT {} FROM web_resources WHERE scan_session_id = ?1 AND url = ?2",
            RESOURCE_COLUMNS
        );
        let resource = self
            .conn
            .query_row(&sql, params![session_id, url], resource_from_row)
            .optional()?;
        Ok(resource)
    }

    fn list_resources(&self, session_id: i64) -> StorageResult<Vec<WebResource>> {
        let sql = format!(
            "SELECT {} FROM web_resources WHERE scan_session_id = ?1 ORDER BY id ASC",
            RESOURCE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let resources = stmt
            .query_map(params![session_id], resource_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resources)
    }

    fn count_resources(&self, session_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM web_resources WHERE scan_session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_resources_by_type(
        &self,
        session_id: i64,
    ) -> StorageResult<HashMap<ResourceType, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT resource_type, COUNT(*) FROM web_resources
             WHERE scan_session_id = ?1 GROUP BY resource_type",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map(params![session_id], |row| {
            let ty: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((ty, count))
        })?;

        for row in rows {
            let (ty, count) = row?;
            if let Some(resource_type) = ResourceType::from_db_string(&ty) {
                counts.insert(resource_type, count as u64);
            }
        }

        Ok(counts)
    }

    fn record_download_attempt(
        &mut self,
        resource_id: i64,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE web_resources
             SET download_attempts = download_attempts + 1, last_download_at = ?1
             WHERE id = ?2",
            params![at.to_rfc3339(), resource_id],
        )?;
        if changed == 0 {
            return Err(StorageError::ResourceNotFound(resource_id));
        }
        Ok(())
    }

    // ===== Download History =====

    fn append_download_history(
        &mut self,
        entry: &NewDownloadHistory,
    ) -> StorageResult<DownloadHistory> {
        let entry = entry.clone().bounded();
        self.conn.execute(
            "INSERT INTO download_history
             (resource_id, downloaded_at, file_size_bytes, download_duration_seconds,
              success, error_message, client_ip, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.resource_id,
                entry.downloaded_at.to_rfc3339(),
                entry.file_size_bytes.map(|v| v as i64),
                entry.download_duration_seconds,
                entry.success,
                entry.error_message,
                entry.client_ip,
                entry.user_agent
            ],
        )?;

        Ok(DownloadHistory {
            id: self.conn.last_insert_rowid(),
            resource_id: entry.resource_id,
            downloaded_at: entry.downloaded_at,
            file_size_bytes: entry.file_size_bytes,
            download_duration_seconds: entry.download_duration_seconds,
            success: entry.success,
            error_message: entry.error_message,
            client_ip: entry.client_ip,
            user_agent: entry.user_agent,
        })
    }

    fn list_download_history(&self, resource_id: i64) -> StorageResult<Vec<DownloadHistory>> {
        let sql = format!(
            "SELECT {} FROM download_history WHERE resource_id = ?1 ORDER BY id ASC",
            HISTORY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let history = stmt
            .query_map(params![resource_id], history_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(history)
    }
}
