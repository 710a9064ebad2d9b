//! Statistics generation from the scan database
//!
//! This module provides functionality for summarizing one scan session
//! and displaying the summary.

use crate::model::{ResourceType, ScanStatus};
use crate::storage::Storage;
use crate::ScannerError;
use serde::Serialize;
use std::collections::HashMap;

/// Scan session statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatistics {
    pub session_id: i64,
    pub target_url: String,
    pub status: ScanStatus,
    pub scan_duration_seconds: Option<f64>,
    pub error_message: Option<String>,

    /// Rows currently stored for the session
    pub total_resources: u64,

    /// Count of resources by type
    pub resources_by_type: HashMap<ResourceType, u64>,

    /// Sum of known resource sizes
    pub total_bytes: u64,

    /// Resources whose size is known
    pub sized_resources: u64,

    pub downloadable_resources: u64,

    /// Sum of `download_attempts` over all resources
    pub download_attempts: u64,

    pub downloads_succeeded: u64,
    pub downloads_failed: u64,
}

/// Loads statistics for one session from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `session_id` - The session to summarize
///
/// # Returns
///
/// * `Ok(SessionStatistics)` - Successfully loaded statistics
/// * `Err(ScannerError)` - The session does not exist or a query failed
pub fn load_session_statistics(
    storage: &dyn Storage,
    session_id: i64,
) -> Result<SessionStatistics, ScannerError> {
    let session = storage.get_session(session_id)?;
    let resources = storage.list_resources(session_id)?;
    let resources_by_type = storage.count_resources_by_type(session_id)?;

    let mut stats = SessionStatistics {
        session_id,
        target_url: session.target_url,
        status: session.status,
        scan_duration_seconds: session.scan_duration_seconds,
        error_message: session.error_message,
        total_resources: resources.len() as u64,
        resources_by_type,
        total_bytes: 0,
        sized_resources: 0,
        downloadable_resources: 0,
        download_attempts: 0,
        downloads_succeeded: 0,
        downloads_failed: 0,
    };

    for resource in &resources {
        if let Some(size) = resource.file_size_bytes {
            stats.total_bytes += size;
            stats.sized_resources += 1;
        }
        if resource.is_downloadable {
            stats.downloadable_resources += 1;
        }
        stats.download_attempts += u64::from(resource.download_attempts);

        if resource.download_attempts > 0 {
            for entry in storage.list_download_history(resource.id)? {
                if entry.success {
                    stats.downloads_succeeded += 1;
                } else {
                    stats.downloads_failed += 1;
                }
            }
        }
    }

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &SessionStatistics) {
    println!("=== Scan Statistics ===\n");

    println!("Session {}:", stats.session_id);
    println!("  Target: {}", stats.target_url);
    println!("  Status: {}", stats.status);
    if let Some(duration) = stats.scan_duration_seconds {
        println!("  Duration: {:.2}s", duration);
    }
    if let Some(error) = &stats.error_message {
        println!("  Error: {}", error);
    }
    println!();

    println!("Resources:");
    println!("  Total: {}", stats.total_resources);
    println!(
        "  Known size: {} bytes across {} resources",
        stats.total_bytes, stats.sized_resources
    );
    println!("  Downloadable: {}", stats.downloadable_resources);
    println!();

    println!("Resources by Type:");
    // Sort types by count (descending)
    let mut type_counts: Vec<_> = stats.resources_by_type.iter().collect();
    type_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_db_string().cmp(b.0.to_db_string())));

    for (resource_type, count) in type_counts {
        let percentage = if stats.total_resources > 0 {
            (*count as f64 / stats.total_resources as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", resource_type, count, percentage);
    }
    println!();

    println!(
        "Downloads: {} attempts, {} succeeded, {} failed",
        stats.download_attempts, stats.downloads_succeeded, stats.downloads_failed
    );
}
