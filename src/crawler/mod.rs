//! Crawler module for resource discovery and downloads
//!
//! This module contains the scan pipeline, including:
//! - HTTP fetching with credentials and size limits
//! - Resource classification by content type and extension
//! - HTML and CSS reference extraction
//! - The shared work frontier
//! - Overall scan orchestration
//! - On-demand downloads with retry and history

mod classifier;
mod download;
mod extractor;
mod fetcher;
mod frontier;
mod orchestrator;

pub use classifier::{classify, type_from_content_type, type_from_extension, url_extension};
pub use download::{DownloadContext, DownloadManager, DownloadOutcome};
pub use extractor::{extract, ExtractedLink, Extraction};
pub use fetcher::{parse_http_date, FetchError, FetchResponse, Fetcher};
pub use frontier::Frontier;
pub use orchestrator::{run_scan, ScanOrchestrator};
