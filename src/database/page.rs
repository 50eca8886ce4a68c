use serde::Deserialize;

use crate::config::ApiConfig;

/// Raw `?page=&size=` query, kept as text so bad values can be coerced
/// instead of rejected
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    pub mine: Option<String>,
}

impl PageQuery {
    pub fn mine(&self) -> bool {
        matches!(self.mine.as_deref(), Some("true") | Some("1"))
    }
}

/// Zero-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    /// Non-numeric or non-positive sizes fall back to the default size,
    /// sizes above the configured maximum are clamped, and unusable page
    /// numbers become page 0.
    pub fn from_query(query: &PageQuery, api: &ApiConfig) -> Self {
        let size = query
            .size
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|s| *s > 0)
            .map(|s| s.min(api.max_page_size))
            .unwrap_or(api.default_page_size);

        let page = query
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 0)
            .unwrap_or(0);

        Self { page, size }
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        self.size.saturating_mul(self.page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 10 }
    }
}
