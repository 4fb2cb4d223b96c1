//! # Common API Types
//!
//! The success envelope shared by every endpoint, plus page-number pagination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, validation_error};
use crate::repositories::{Page, PageRequest};

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Success envelope: `{success: true, data, message, timestamp}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always `true`
    pub success: bool,
    pub data: T,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }
}

/// Position of a page within a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.limit.max(1));
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

/// Envelope for list endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    /// Always `true`
    pub success: bool,
    pub data: Vec<T>,
    pub message: Option<String>,
    pub pagination: PaginationMeta,
    pub timestamp: DateTime<Utc>,
}

impl<T> PaginatedResponse<T> {
    pub fn from_page(page: Page<T>) -> Self {
        Self {
            success: true,
            pagination: PaginationMeta::new(page.request, page.total),
            data: page.items,
            message: None,
            timestamp: Utc::now(),
        }
    }
}

/// `page` (≥ 1, default 1) and `limit` (1–100, default 10).
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    #[param(minimum = 1, example = 1)]
    pub page: Option<u64>,
    #[param(minimum = 1, maximum = 100, example = 10)]
    pub limit: Option<u64>,
}

impl PaginationQuery {
    pub fn into_request(self) -> Result<PageRequest, ApiError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

        if page < 1 {
            return Err(validation_error(
                "Invalid pagination",
                serde_json::json!({ "page": "must be at least 1" }),
            ));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(validation_error(
                "Invalid pagination",
                serde_json::json!({ "limit": format!("must be between 1 and {}", MAX_PAGE_LIMIT) }),
            ));
        }

        Ok(PageRequest::new(page, limit))
    }
}
