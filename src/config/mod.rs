//! Configuration module for the scanner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use web_resource_scanner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scanner.toml")).unwrap();
//! println!("Scanner will use {} workers", config.scanner.max_workers);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, DownloadConfig, FetcherConfig, OutputConfig, ScannerConfig, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, MAX_REDIRECT_CAP};
