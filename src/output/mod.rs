//! Output module for presenting scan results
//!
//! This module handles:
//! - Per-session statistics (resources by type, bytes, download attempts)
//! - Human-readable and JSON rendering for the command-line front end

pub mod stats;

pub use stats::{load_session_statistics, print_statistics, SessionStatistics};

use serde::Serialize;

/// Serializes a value as pretty JSON
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Prints a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", to_json(value)?);
    Ok(())
}
