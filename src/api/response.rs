//! Outbound response shapes
//!
//! Timestamps are rendered as RFC 3339 strings.

use crate::api::ResourceFilter;
use crate::model::{DownloadHistory, ResourceType, ScanSession, ScanStatus, WebResource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub id: i64,
    pub target_url: String,
    pub status: ScanStatus,
    pub created_at: String,
    pub total_resources_found: u64,
    pub error_message: Option<String>,
}

impl From<&ScanSession> for ScanResponse {
    fn from(session: &ScanSession) -> Self {
        Self {
            id: session.id,
            target_url: session.target_url.clone(),
            status: session.status,
            created_at: session.created_at.to_rfc3339(),
            total_resources_found: session.total_resources_found,
            error_message: session.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub id: i64,
    pub url: String,
    pub relative_path: String,
    pub resource_type: ResourceType,
    pub file_extension: String,
    pub content_type: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub last_modified: Option<String>,
    pub is_downloadable: bool,
    pub discovered_at: String,
    pub source_element: Option<String>,
}

impl From<&WebResource> for ResourceResponse {
    fn from(resource: &WebResource) -> Self {
        Self {
            id: resource.id,
            url: resource.url.clone(),
            relative_path: resource.relative_path.clone(),
            resource_type: resource.resource_type,
            file_extension: resource.file_extension.clone(),
            content_type: resource.content_type.clone(),
            file_size_bytes: resource.file_size_bytes,
            last_modified: resource.last_modified.map(|t| t.to_rfc3339()),
            is_downloadable: resource.is_downloadable,
            discovered_at: resource.discovered_at.to_rfc3339(),
            source_element: resource.source_element.clone(),
        }
    }
}

/// One page of resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceListResponse {
    pub resources: Vec<ResourceResponse>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl ResourceListResponse {
    /// Builds a page from already-sliced resources
    ///
    /// `page` is 1-based; `has_next` holds while earlier pages plus this one
    /// cover fewer than `total_count` items.
    pub fn new(resources: Vec<ResourceResponse>, total_count: u64, page: u32, page_size: u32) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let seen = u64::from(page) * u64::from(page_size);
        Self {
            resources,
            total_count,
            page,
            page_size,
            has_next: seen < total_count,
            has_previous: page > 1,
        }
    }

    /// Filters a session's resources and cuts out the requested page
    pub fn paginate(
        resources: &[WebResource],
        filter: &ResourceFilter,
        page: u32,
        page_size: u32,
    ) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let matching: Vec<&WebResource> = resources.iter().filter(|r| filter.matches(r)).collect();
        let offset = (page as usize - 1).saturating_mul(page_size as usize);

        let slice = matching
            .iter()
            .skip(offset)
            .take(page_size as usize)
            .map(|r| ResourceResponse::from(*r))
            .collect();

        Self::new(slice, matching.len() as u64, page, page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadHistoryResponse {
    pub id: i64,
    pub resource_id: i64,
    pub downloaded_at: String,
    pub file_size_bytes: Option<u64>,
    pub download_duration_seconds: Option<f64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<&DownloadHistory> for DownloadHistoryResponse {
    fn from(entry: &DownloadHistory) -> Self {
        Self {
            id: entry.id,
            resource_id: entry.resource_id,
            downloaded_at: entry.downloaded_at.to_rfc3339(),
            file_size_bytes: entry.file_size_bytes,
            download_duration_seconds: entry.download_duration_seconds,
            success: entry.success,
            error_message: entry.error_message.clone(),
            client_ip: entry.client_ip.clone(),
            user_agent: entry.user_agent.clone(),
        }
    }
}
