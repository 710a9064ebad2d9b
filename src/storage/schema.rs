//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the scanner database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One crawl campaign per row
CREATE TABLE IF NOT EXISTS scan_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    username TEXT,
    password TEXT,
    auth_token TEXT,
    payload TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    error_message TEXT,
    total_resources_found INTEGER NOT NULL DEFAULT 0,
    scan_duration_seconds REAL
);

CREATE INDEX IF NOT EXISTS idx_scan_sessions_target ON scan_sessions(target_url);

-- Discovered assets; a URL appears at most once per session
CREATE TABLE IF NOT EXISTS web_resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_session_id INTEGER NOT NULL REFERENCES scan_sessions(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    resource_type TEXT NOT NULL,
    file_extension TEXT NOT NULL,
    content_type TEXT,
    file_size_bytes INTEGER,
    last_modified TEXT,
    is_downloadable INTEGER NOT NULL DEFAULT 1,
    download_attempts INTEGER NOT NULL DEFAULT 0,
    last_download_at TEXT,
    discovered_at TEXT NOT NULL,
    source_element TEXT,
    UNIQUE(scan_session_id, url)
);

CREATE INDEX IF NOT EXISTS idx_web_resources_session ON web_resources(scan_session_id);
CREATE INDEX IF NOT EXISTS idx_web_resources_type ON web_resources(resource_type);
CREATE INDEX IF NOT EXISTS idx_web_resources_extension ON web_resources(file_extension);

-- Append-only download log
CREATE TABLE IF NOT EXISTS download_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_id INTEGER NOT NULL REFERENCES web_resources(id) ON DELETE CASCADE,
    downloaded_at TEXT NOT NULL,
    file_size_bytes INTEGER,
    download_duration_seconds REAL,
    success INTEGER NOT NULL DEFAULT 1,
    error_message TEXT,
    client_ip TEXT,
    user_agent TEXT
);

CREATE INDEX IF NOT EXISTS idx_download_history_resource ON download_history(resource_id);

CREATE TRIGGER IF NOT EXISTS download_history_append_only
BEFORE UPDATE ON download_history
BEGIN
    SELECT RAISE(ABORT, 'download_history is append-only');
END;
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
