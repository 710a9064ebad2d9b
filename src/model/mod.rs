//! Data model for scan sessions, resources and download history
//!
//! # Components
//!
//! - `ScanStatus`: lifecycle state machine of a scan session
//! - `ResourceType`: closed classification of discovered assets
//! - Records: the persisted entities plus the forms used to insert them

mod records;
mod resource_type;
mod status;

pub use records::{
    Credentials, DownloadHistory, NewDownloadHistory, NewScanSession, NewWebResource,
    ResourceMetadata, ScanSession, WebResource,
};
pub use resource_type::ResourceType;
pub use status::ScanStatus;

/// Column size bounds, in characters
pub mod limits {
    pub const TARGET_URL: usize = 2048;
    pub const USERNAME: usize = 255;
    pub const PASSWORD: usize = 255;
    pub const AUTH_TOKEN: usize = 1024;
    pub const PAYLOAD: usize = 10_000;
    pub const SESSION_ERROR_MESSAGE: usize = 1000;

    pub const RESOURCE_URL: usize = 2048;
    pub const RELATIVE_PATH: usize = 1024;
    pub const FILE_EXTENSION: usize = 10;
    pub const CONTENT_TYPE: usize = 100;
    pub const SOURCE_ELEMENT: usize = 50;

    pub const DOWNLOAD_ERROR_MESSAGE: usize = 500;
    pub const CLIENT_IP: usize = 45;
    pub const USER_AGENT: usize = 500;

    pub const SEARCH_QUERY: usize = 255;
}

/// Truncates a string to at most `max` characters on a char boundary
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_untouched() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn test_truncate_respects_multibyte_chars() {
        let s = "héllo wörld";
        let truncated = truncate_chars(s, 2);
        assert_eq!(truncated, "hé");
    }
}
