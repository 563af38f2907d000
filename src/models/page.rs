use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self, default: u32) -> u32 {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self, default: u32) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.limit(default))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, params: &PageParams, default_limit: u32, total: i64) -> Self {
        Page {
            items,
            page: params.page(),
            limit: params.limit(default_limit),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(20), 20);
        assert_eq!(params.offset(20), 0);
    }

    #[test]
    fn test_clamping() {
        let params = PageParams {
            page: Some(0),
            limit: Some(500),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(20), MAX_PAGE_SIZE);

        let params = PageParams {
            page: Some(3),
            limit: Some(0),
        };
        assert_eq!(params.limit(20), 1);
        assert_eq!(params.offset(20), 2);
    }

    #[test]
    fn test_offset() {
        let params = PageParams {
            page: Some(4),
            limit: Some(25),
        };
        assert_eq!(params.offset(20), 75);
    }
}
