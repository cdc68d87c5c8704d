use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

// ============================================================================
// Envelope
// ============================================================================

/// Successful response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub meta: Option<ResponseMeta>,
    pub timestamp: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pagination: Option<PaginationMeta>,
}

/// Failed response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
    pub timestamp: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field_errors: Option<Vec<FieldError>>,
}

/// One violated field constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(page.per_page);
        Self {
            page: page.page,
            per_page: page.per_page,
            total,
            total_pages,
            has_next: page.page < total_pages,
            has_prev: page.page > 1,
        }
    }
}

/// Normalized page request: `page` is 1-based, `per_page` is within 1..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn from_params(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE),
            per_page: per_page
                .filter(|p| *p > 0)
                .unwrap_or(DEFAULT_PER_PAGE)
                .min(MAX_PER_PAGE),
        }
    }

    /// Zero-based page index for paginators
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::from_params(None, None)
    }
}

/// One page of items plus the total count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamping() {
        assert_eq!(
            PageRequest::from_params(None, None),
            PageRequest { page: 1, per_page: 20 }
        );
        assert_eq!(
            PageRequest::from_params(Some(0), Some(500)),
            PageRequest { page: 1, per_page: 100 }
        );
        assert_eq!(PageRequest::from_params(Some(3), Some(0)).per_page, 20);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(PageRequest::from_params(Some(2), Some(20)), 45);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);

        let last = PaginationMeta::new(PageRequest::from_params(Some(3), Some(20)), 45);
        assert!(!last.has_next);

        let empty = PaginationMeta::new(PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn test_error_body_omits_empty_parts() {
        let body = ErrorBody {
            code: "NOT_FOUND".into(),
            message: "Deal not found".into(),
            details: None,
            field_errors: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
        assert!(json.get("field_errors").is_none());
    }
}
