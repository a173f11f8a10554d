//! Response DTOs.

use serde::{Deserialize, Serialize};

use assetdesk_core::types::{JobId, PageResponse};
use assetdesk_service::Preferences;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T: Serialize> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Total item count.
    pub total: u64,
    /// Current page.
    pub page: u64,
    /// Items per page.
    pub per_page: u64,
    /// Total pages.
    pub total_pages: u64,
}

impl<T: Serialize> From<PageResponse<T>> for PaginatedResponse<T> {
    fn from(page: PageResponse<T>) -> Self {
        Self {
            items: page.items,
            total: page.total_items,
            page: page.page,
            per_page: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok".
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// The caller's resolved preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesResponse {
    /// Username from the token.
    pub username: String,
    /// Resolved preferences.
    #[serde(flatten)]
    pub preferences: Preferences,
}

/// Returned with 202 when an export is queued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportQueuedResponse {
    /// Job that will produce the file.
    pub job_id: JobId,
    /// Always "queued".
    pub status: String,
    /// Human-readable note.
    pub message: String,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}
