//! Request and response schemas
//!
//! Inbound shapes carry explicit `validate` methods that return a typed
//! `ValidationError`; nothing reaches storage until they pass.

mod filter;
mod request;
mod response;

pub use filter::ResourceFilter;
pub use request::{DownloadRequest, ScanRequest, ScanStatusUpdate};
pub use response::{
    DownloadHistoryResponse, ResourceListResponse, ResourceResponse, ScanResponse,
};
